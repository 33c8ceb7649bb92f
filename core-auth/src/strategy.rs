//! URL delivery and code collection.
//!
//! Both steps of the interactive half of the flow are pluggable per channel
//! through [`CommandStrategy`]:
//!
//! | Step          | Built-in                 | External command                      |
//! |---------------|--------------------------|---------------------------------------|
//! | request URL   | open the system browser  | `<cmd> '<url>'`, output discarded     |
//! | fetch code    | read one console line    | `<cmd> <request_ts>`, polled until not `(null)` |

use bridge_traits::{Clock, CommandRunner, ConsolePrompt, UrlLauncher};
use core_runtime::config::{CommandStrategy, PlatformBridges, NULL_SENTINEL};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Console prompt shown by the built-in code fetcher.
pub const CODE_PROMPT: &str = "Please input the whole url from Browser's address bar:";

/// Bounded retry settings for an external code-fetch command.
///
/// A command still running after `attempt_timeout` is abandoned and that
/// attempt reads as `(null)`, so a hanging command cannot outlast the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Total invocations, including the first. Never less than one.
    pub max_attempts: u32,
    /// Pause between two invocations
    pub delay: Duration,
    /// Upper bound for a single invocation
    pub attempt_timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl PollPolicy {
    /// `max_attempts` of zero is raised to one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            ..Self::default()
        }
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Outcome of waiting for the authorization callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedCode {
    /// Raw callback value, normally the full redirected URL
    Code(String),
    /// Nothing arrived: polling ran out, was cancelled or the console failed
    Unavailable,
}

impl FetchedCode {
    pub fn is_available(&self) -> bool {
        matches!(self, FetchedCode::Code(_))
    }
}

/// Wrap `value` in single quotes for the platform shell.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Shows the authorization URL to the user.
pub struct UrlRequestStrategy {
    strategy: CommandStrategy,
    launcher: Arc<dyn UrlLauncher>,
    runner: Arc<dyn CommandRunner>,
    clock: Arc<dyn Clock>,
}

impl UrlRequestStrategy {
    pub fn new(
        strategy: CommandStrategy,
        launcher: Arc<dyn UrlLauncher>,
        runner: Arc<dyn CommandRunner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            strategy,
            launcher,
            runner,
            clock,
        }
    }

    pub fn from_bridges(strategy: CommandStrategy, bridges: &PlatformBridges) -> Self {
        Self::new(
            strategy,
            bridges.url_launcher.clone(),
            bridges.command_runner.clone(),
            bridges.clock.clone(),
        )
    }

    /// Deliver `url` without waiting for the user.
    ///
    /// Returns the Unix time at which an external command was asked to show
    /// the URL; the built-in browser path records nothing. Failures are
    /// logged and swallowed.
    pub async fn request(&self, url: &str) -> Option<i64> {
        match &self.strategy {
            CommandStrategy::BuiltIn => {
                if let Err(e) = self.launcher.open_url(url) {
                    warn!(error = %e, "Could not open browser, visit this URL manually: {}", url);
                }
                None
            }
            CommandStrategy::External(command) => {
                let requested_at = self.clock.unix_timestamp();
                let command = format!("{} {}", command, shell_quote(url));
                debug!(command = %command, "Running request_url command");

                match self.runner.run(&command).await {
                    Ok(output) => {
                        if !output.success {
                            warn!(command = %command, "request_url command exited with failure");
                        }
                        debug!(output = output.trimmed(), "request_url command finished");
                    }
                    Err(e) => warn!(error = %e, "request_url command could not be run"),
                }
                Some(requested_at)
            }
        }
    }
}

/// Collects the callback value after the user has authorized the app.
pub struct CodeFetchStrategy {
    strategy: CommandStrategy,
    console: Arc<dyn ConsolePrompt>,
    runner: Arc<dyn CommandRunner>,
    clock: Arc<dyn Clock>,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl CodeFetchStrategy {
    pub fn new(
        strategy: CommandStrategy,
        console: Arc<dyn ConsolePrompt>,
        runner: Arc<dyn CommandRunner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            strategy,
            console,
            runner,
            clock,
            policy: PollPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_bridges(strategy: CommandStrategy, bridges: &PlatformBridges) -> Self {
        Self::new(
            strategy,
            bridges.console.clone(),
            bridges.command_runner.clone(),
            bridges.clock.clone(),
        )
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use `cancel` to abort a pending wait from another task.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Wait for the callback value.
    ///
    /// `requested_at` is the timestamp returned by
    /// [`UrlRequestStrategy::request`]; the current time is used when absent.
    pub async fn fetch(&self, requested_at: Option<i64>) -> FetchedCode {
        match &self.strategy {
            CommandStrategy::BuiltIn => self.prompt_console().await,
            CommandStrategy::External(command) => {
                let requested_at = requested_at.unwrap_or_else(|| self.clock.unix_timestamp());
                self.poll_command(&format!("{} {}", command, requested_at))
                    .await
            }
        }
    }

    async fn prompt_console(&self) -> FetchedCode {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                info!("Code fetch cancelled");
                FetchedCode::Unavailable
            }
            line = self.console.prompt_line(CODE_PROMPT) => match line {
                Ok(line) => FetchedCode::Code(line),
                Err(e) => {
                    warn!(error = %e, "Could not read callback URL from console");
                    FetchedCode::Unavailable
                }
            },
        }
    }

    /// One invocation; failures and timeouts read as the `(null)` sentinel.
    async fn run_once(&self, command: &str) -> String {
        let run = self.runner.run(command);
        match tokio::time::timeout(self.policy.attempt_timeout, run).await {
            Ok(Ok(output)) if output.success => output.first_line().to_string(),
            Ok(Ok(_)) => {
                warn!(command = %command, "fetch_code command exited with failure");
                NULL_SENTINEL.to_string()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "fetch_code command could not be run");
                NULL_SENTINEL.to_string()
            }
            Err(_) => {
                warn!(
                    command = %command,
                    timeout_secs = self.policy.attempt_timeout.as_secs_f64(),
                    "fetch_code command timed out"
                );
                NULL_SENTINEL.to_string()
            }
        }
    }

    async fn poll_command(&self, command: &str) -> FetchedCode {
        debug!(command = %command, "Running fetch_code command");

        let max_attempts = self.policy.attempts();
        for attempt in 1..=max_attempts {
            let answer = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!(attempt, "Code fetch cancelled");
                    return FetchedCode::Unavailable;
                }
                answer = self.run_once(command) => answer,
            };

            if answer != NULL_SENTINEL {
                debug!(attempt, "fetch_code command returned a value");
                return FetchedCode::Code(answer);
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        info!(attempt, "Code fetch cancelled");
                        return FetchedCode::Unavailable;
                    }
                    _ = tokio::time::sleep(self.policy.delay) => {}
                }
            }
        }

        warn!(
            attempts = max_attempts,
            "fetch_code command never returned a value"
        );
        FetchedCode::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::{CommandOutput, FixedClock};
    use mockall::mock;
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    mock! {
        Launcher {}

        impl UrlLauncher for Launcher {
            fn open_url(&self, url: &str) -> BridgeResult<()>;
        }
    }

    mock! {
        Console {}

        #[async_trait]
        impl ConsolePrompt for Console {
            async fn prompt_line(&self, message: &str) -> BridgeResult<String>;
        }
    }

    mock! {
        Runner {}

        #[async_trait]
        impl CommandRunner for Runner {
            async fn run(&self, command: &str) -> BridgeResult<CommandOutput>;
        }
    }

    /// Prints `(null)` a fixed number of times, then the callback URL.
    struct CountingRunner {
        calls: AtomicU32,
        nulls_before_code: u32,
    }

    impl CountingRunner {
        fn new(nulls_before_code: u32) -> Self {
            Self {
                calls: AtomicU32::new(0),
                nulls_before_code,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CommandRunner for CountingRunner {
        async fn run(&self, _command: &str) -> BridgeResult<CommandOutput> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call > self.nulls_before_code {
                Ok(CommandOutput::new(true, "http://cb?code=7\n"))
            } else {
                Ok(CommandOutput::new(true, "(null)\n"))
            }
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::at_unix(1_000))
    }

    fn fetcher(strategy: CommandStrategy, runner: Arc<dyn CommandRunner>) -> CodeFetchStrategy {
        CodeFetchStrategy::new(strategy, Arc::new(MockConsole::new()), runner, clock())
            .with_policy(PollPolicy::new(30, Duration::from_millis(1)))
    }

    fn external(command: &str) -> CommandStrategy {
        CommandStrategy::External(command.to_string())
    }

    #[test]
    fn test_poll_policy_default() {
        let policy = PollPolicy::default();
        assert_eq!(policy.max_attempts, 30);
        assert_eq!(policy.delay, Duration::from_secs(2));
        assert_eq!(policy.attempt_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_poll_policy_runs_at_least_once() {
        assert_eq!(PollPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_zero_attempt_policy_still_runs_command() {
        let runner = Arc::new(CountingRunner::new(0));
        let policy = PollPolicy {
            max_attempts: 0,
            ..PollPolicy::default()
        };
        let strategy = fetcher(external("./fetch.sh"), runner.clone()).with_policy(policy);

        assert_eq!(
            strategy.fetch(Some(1)).await,
            FetchedCode::Code("http://cb?code=7".to_string())
        );
        assert_eq!(runner.calls(), 1);
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("http://a?b=1&c=2"), "'http://a?b=1&c=2'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[tokio::test]
    async fn test_builtin_request_opens_browser() {
        let mut launcher = MockLauncher::new();
        launcher
            .expect_open_url()
            .with(eq("https://auth/authorize?x=1"))
            .times(1)
            .returning(|_| Ok(()));

        let strategy = UrlRequestStrategy::new(
            CommandStrategy::BuiltIn,
            Arc::new(launcher),
            Arc::new(MockRunner::new()),
            clock(),
        );

        assert_eq!(strategy.request("https://auth/authorize?x=1").await, None);
    }

    #[tokio::test]
    async fn test_builtin_request_survives_launch_failure() {
        let mut launcher = MockLauncher::new();
        launcher
            .expect_open_url()
            .returning(|_| Err(BridgeError::NotAvailable("no display".to_string())));

        let strategy = UrlRequestStrategy::new(
            CommandStrategy::BuiltIn,
            Arc::new(launcher),
            Arc::new(MockRunner::new()),
            clock(),
        );

        assert_eq!(strategy.request("https://auth").await, None);
    }

    #[tokio::test]
    async fn test_external_request_runs_command_and_records_time() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .with(eq("./show_url.sh 'https://auth/authorize?x=1'"))
            .times(1)
            .returning(|_| Ok(CommandOutput::new(true, "shown\n")));

        let strategy = UrlRequestStrategy::new(
            external("./show_url.sh"),
            Arc::new(MockLauncher::new()),
            Arc::new(runner),
            clock(),
        );

        assert_eq!(strategy.request("https://auth/authorize?x=1").await, Some(1_000));
    }

    #[tokio::test]
    async fn test_external_request_ignores_command_failure() {
        let mut runner = MockRunner::new();
        runner.expect_run().returning(|command| {
            Err(BridgeError::CommandFailed {
                command: command.to_string(),
                reason: "not found".to_string(),
            })
        });

        let strategy = UrlRequestStrategy::new(
            external("./missing.sh"),
            Arc::new(MockLauncher::new()),
            Arc::new(runner),
            clock(),
        );

        assert_eq!(strategy.request("https://auth").await, Some(1_000));
    }

    #[tokio::test]
    async fn test_builtin_fetch_prompts_console() {
        let mut console = MockConsole::new();
        console
            .expect_prompt_line()
            .with(eq(CODE_PROMPT))
            .times(1)
            .returning(|_| Ok("http://cb?code=42".to_string()));

        let strategy = CodeFetchStrategy::new(
            CommandStrategy::BuiltIn,
            Arc::new(console),
            Arc::new(MockRunner::new()),
            clock(),
        );

        assert_eq!(
            strategy.fetch(None).await,
            FetchedCode::Code("http://cb?code=42".to_string())
        );
    }

    #[tokio::test]
    async fn test_builtin_fetch_console_error_is_unavailable() {
        let mut console = MockConsole::new();
        console
            .expect_prompt_line()
            .returning(|_| Err(BridgeError::OperationFailed("stdin closed".to_string())));

        let strategy = CodeFetchStrategy::new(
            CommandStrategy::BuiltIn,
            Arc::new(console),
            Arc::new(MockRunner::new()),
            clock(),
        );

        assert_eq!(strategy.fetch(None).await, FetchedCode::Unavailable);
    }

    #[tokio::test]
    async fn test_external_fetch_passes_request_time() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .with(eq("./fetch.sh 1234"))
            .times(1)
            .returning(|_| Ok(CommandOutput::new(true, "http://cb?code=9\n")));

        let strategy = fetcher(external("./fetch.sh"), Arc::new(runner));
        assert_eq!(
            strategy.fetch(Some(1234)).await,
            FetchedCode::Code("http://cb?code=9".to_string())
        );
    }

    #[tokio::test]
    async fn test_external_fetch_without_request_time_uses_clock() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .with(eq("./fetch.sh 1000"))
            .times(1)
            .returning(|_| Ok(CommandOutput::new(true, "http://cb?code=9")));

        let strategy = fetcher(external("./fetch.sh"), Arc::new(runner));
        assert!(strategy.fetch(None).await.is_available());
    }

    #[tokio::test]
    async fn test_external_fetch_retries_until_value() {
        let runner = Arc::new(CountingRunner::new(3));
        let strategy = fetcher(external("./fetch.sh"), runner.clone());

        assert_eq!(
            strategy.fetch(Some(1)).await,
            FetchedCode::Code("http://cb?code=7".to_string())
        );
        assert_eq!(runner.calls(), 4);
    }

    #[tokio::test]
    async fn test_external_fetch_gives_up_after_thirty_attempts() {
        let runner = Arc::new(CountingRunner::new(u32::MAX));
        let strategy = fetcher(external("./fetch.sh"), runner.clone());

        assert_eq!(strategy.fetch(Some(1)).await, FetchedCode::Unavailable);
        assert_eq!(runner.calls(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_fetch_waits_between_attempts() {
        let runner = Arc::new(CountingRunner::new(u32::MAX));
        let strategy = CodeFetchStrategy::new(
            external("./fetch.sh"),
            Arc::new(MockConsole::new()),
            runner.clone(),
            clock(),
        );

        let started = tokio::time::Instant::now();
        assert_eq!(strategy.fetch(Some(1)).await, FetchedCode::Unavailable);

        assert_eq!(runner.calls(), 30);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2 * 29));
        assert!(elapsed < Duration::from_secs(2 * 30));
    }

    #[tokio::test]
    async fn test_external_fetch_failures_count_as_null() {
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .times(3)
            .returning(|_| Ok(CommandOutput::new(false, "http://cb?code=ignored")));

        let strategy = CodeFetchStrategy::new(
            external("./fetch.sh"),
            Arc::new(MockConsole::new()),
            Arc::new(runner),
            clock(),
        )
        .with_policy(PollPolicy::new(3, Duration::from_millis(1)));

        assert_eq!(strategy.fetch(Some(1)).await, FetchedCode::Unavailable);
    }

    /// Never answers, like a fetch script stuck waiting on the network.
    struct HangingRunner {
        calls: AtomicU32,
    }

    #[async_trait]
    impl CommandRunner for HangingRunner {
        async fn run(&self, _command: &str) -> BridgeResult<CommandOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_fetch_command_is_bounded_by_attempt_cap() {
        let runner = Arc::new(HangingRunner {
            calls: AtomicU32::new(0),
        });
        let strategy = CodeFetchStrategy::new(
            external("./fetch.sh"),
            Arc::new(MockConsole::new()),
            runner.clone(),
            clock(),
        )
        .with_policy(
            PollPolicy::new(3, Duration::from_secs(2))
                .with_attempt_timeout(Duration::from_secs(5)),
        );

        let started = tokio::time::Instant::now();
        assert_eq!(strategy.fetch(Some(1)).await, FetchedCode::Unavailable);

        assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(3 * 5 + 2 * 2));
    }

    #[tokio::test]
    async fn test_cancelled_fetch_stops_polling() {
        let runner = Arc::new(CountingRunner::new(u32::MAX));
        let cancel = CancellationToken::new();
        let strategy = CodeFetchStrategy::new(
            external("./fetch.sh"),
            Arc::new(MockConsole::new()),
            runner.clone(),
            clock(),
        )
        .with_policy(PollPolicy::new(30, Duration::from_secs(3600)))
        .with_cancellation(cancel.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        assert_eq!(strategy.fetch(Some(1)).await, FetchedCode::Unavailable);
        canceller.await.unwrap();
        assert_eq!(runner.calls(), 1);
    }
}
