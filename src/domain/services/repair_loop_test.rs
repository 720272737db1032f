use std::collections::VecDeque;
use std::path;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use test_utils::fenced;
use test_utils::traceback_fixture;
use tokio::sync::mpsc;

use super::fix_prompt;
use super::language_for_suffix;
use super::RepairConfig;
use super::RepairLoop;
use super::SYSTEM_PROMPT;
use crate::domain::models::AbortReason;
use crate::domain::models::Author;
use crate::domain::models::Backend;
use crate::domain::models::BackendName;
use crate::domain::models::ChatMessage;
use crate::domain::models::Event;
use crate::domain::models::ExecutionResult;
use crate::domain::models::MessageType;
use crate::domain::models::Role;
use crate::domain::models::Runner;
use crate::domain::models::SessionState;
use crate::domain::services::ArtifactStore;

#[derive(Clone, Default)]
struct ScriptedBackend {
    responses: Arc<Mutex<VecDeque<Result<String>>>>,
    requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<Result<String>>) -> ScriptedBackend {
        return ScriptedBackend {
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            requests: Arc::new(Mutex::new(vec![])),
        };
    }

    fn requests(&self) -> Vec<Vec<ChatMessage>> {
        return self.requests.lock().unwrap().clone();
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> BackendName {
        return BackendName::OpenAI;
    }

    async fn health_check(&self) -> Result<()> {
        return Ok(());
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        return Ok(vec![]);
    }

    async fn get_completion(&self, _model: &str, messages: &[ChatMessage]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let next = self.responses.lock().unwrap().pop_front();
        return match next {
            Some(res) => res,
            None => Ok(fenced("print('out of script')")),
        };
    }
}

#[derive(Clone, Default)]
struct ScriptedRunner {
    results: Arc<Mutex<VecDeque<Result<ExecutionResult>>>>,
    executed: Arc<Mutex<Vec<path::PathBuf>>>,
}

impl ScriptedRunner {
    fn new(results: Vec<Result<ExecutionResult>>) -> ScriptedRunner {
        return ScriptedRunner {
            results: Arc::new(Mutex::new(results.into_iter().collect())),
            executed: Arc::new(Mutex::new(vec![])),
        };
    }
}

#[async_trait]
impl Runner for ScriptedRunner {
    async fn execute(&self, filename: &path::Path) -> Result<ExecutionResult> {
        self.executed.lock().unwrap().push(filename.to_path_buf());
        let next = self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| return Ok(failing(traceback_fixture())));

        let mut res = next?;
        res.filename = filename.to_path_buf();
        return Ok(res);
    }
}

fn passing(stdout: &str) -> ExecutionResult {
    return ExecutionResult {
        stdout: stdout.to_string(),
        exit_code: Some(0),
        ..ExecutionResult::default()
    };
}

fn failing(stderr: &str) -> ExecutionResult {
    return ExecutionResult {
        stderr: stderr.to_string(),
        exit_code: Some(1),
        ..ExecutionResult::default()
    };
}

fn repair_config() -> RepairConfig {
    return RepairConfig {
        model: "gpt-4o-mini".to_string(),
        max_iterations: 5,
        language: "python".to_string(),
    };
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<(MessageType, String)> {
    let mut res = vec![];
    while let Ok(event) = rx.try_recv() {
        if let Event::SessionMessage(msg) = event {
            res.push((msg.message_type(), msg.text));
        }
    }

    return res;
}

fn texts(messages: &[(MessageType, String)]) -> Vec<String> {
    return messages
        .iter()
        .map(|(_, text)| return text.to_string())
        .collect();
}

#[tokio::test]
async fn it_finishes_after_one_generation_when_the_program_runs_cleanly() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let backend = ScriptedBackend::new(vec![Ok(fenced("print('hello world')"))]);
    let runner = ScriptedRunner::new(vec![Ok(passing("hello world\n"))]);
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    let repair_loop = RepairLoop::new(
        Box::new(backend.clone()),
        Box::new(runner.clone()),
        ArtifactStore::new(dir.path().to_path_buf(), ".py"),
        repair_config(),
    );
    let session = repair_loop.run_session("print hello world", &tx).await?;

    assert_eq!(session.state, SessionState::Done);
    assert!(session.state.is_terminal());
    assert_eq!(session.generations, 1);
    assert_eq!(session.iteration, 0);
    assert_eq!(session.artifacts.len(), 1);
    assert_eq!(
        std::fs::read_to_string(&session.artifacts[0])?,
        "print('hello world')"
    );
    assert_eq!(session.conversation.len(), 3);
    assert_eq!(backend.requests().len(), 1);

    let messages = texts(&drain(&mut rx));
    assert_eq!(messages.len(), 5);
    assert_eq!(
        messages[0],
        "Generating initial code based on your prompt..."
    );
    assert_eq!(
        messages[1],
        "Generated Code:\n```python\nprint('hello world')\n```"
    );
    assert_eq!(
        messages[2],
        format!("Code saved to: {}", session.artifacts[0].display())
    );
    assert_eq!(messages[3], "Execution output:\nhello world\n\nErrors:\n");
    assert_eq!(messages[4], "Final output:\nhello world\n");

    return Ok(());
}

#[tokio::test]
async fn it_feeds_the_error_back_and_succeeds_on_the_second_attempt() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let backend = ScriptedBackend::new(vec![
        Ok(fenced("print(undefined_name)")),
        Ok(fenced("print('fixed')")),
    ]);
    let runner = ScriptedRunner::new(vec![
        Ok(failing(traceback_fixture())),
        Ok(passing("fixed\n")),
    ]);
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    let repair_loop = RepairLoop::new(
        Box::new(backend.clone()),
        Box::new(runner.clone()),
        ArtifactStore::new(dir.path().to_path_buf(), ".py"),
        repair_config(),
    );
    let session = repair_loop.run_session("print a name", &tx).await?;

    assert_eq!(session.state, SessionState::Done);
    assert_eq!(session.generations, 2);
    assert_eq!(session.iteration, 1);
    assert_eq!(session.artifacts.len(), 2);
    assert_ne!(session.artifacts[0], session.artifacts[1]);
    assert_eq!(*runner.executed.lock().unwrap(), session.artifacts);

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].len(), 4);
    assert_eq!(requests[1][3].role, Role::User);
    assert!(requests[1][3].content.contains(traceback_fixture()));
    assert_eq!(requests[1][3].content, fix_prompt(traceback_fixture()));

    let messages = texts(&drain(&mut rx));
    assert!(messages.contains(&"Attempting to fix errors (Iteration 1)...".to_string()));
    assert!(messages.contains(&"Updated Code:\n```python\nprint('fixed')\n```".to_string()));
    assert_eq!(messages.last().unwrap(), "Final output:\nfixed\n");

    return Ok(());
}

#[tokio::test]
async fn it_gives_up_after_the_iteration_ceiling() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let backend = ScriptedBackend::new(vec![]);
    let runner = ScriptedRunner::new(vec![]);
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    let repair_loop = RepairLoop::new(
        Box::new(backend.clone()),
        Box::new(runner),
        ArtifactStore::new(dir.path().to_path_buf(), ".py"),
        repair_config(),
    );
    let session = repair_loop.run_session("never works", &tx).await?;

    assert_eq!(
        session.state,
        SessionState::Aborted(AbortReason::IterationLimitExceeded)
    );
    assert_eq!(session.generations, 6);
    assert_eq!(session.iteration, 5);
    assert_eq!(session.artifacts.len(), 6);
    assert_eq!(backend.requests().len(), 6);
    assert_eq!(session.conversation.len(), 1 + 2 * (5 + 1));

    let roles = session
        .conversation
        .snapshot()
        .iter()
        .map(|msg| return msg.role)
        .collect::<Vec<Role>>();
    assert_eq!(roles[0], Role::System);
    for (idx, role) in roles.iter().enumerate().skip(1) {
        let expected = if idx % 2 == 1 {
            Role::User
        } else {
            Role::Assistant
        };
        assert_eq!(*role, expected);
    }
    assert_eq!(session.conversation.snapshot()[0].content, SYSTEM_PROMPT);
    assert_eq!(session.conversation.snapshot()[1].content, "never works");

    let messages = drain(&mut rx);
    assert!(messages.contains(&(
        MessageType::Error,
        "Too many iterations. Aborting fix attempts.".to_string()
    )));
    assert!(!texts(&messages).contains(&"Attempting to fix errors (Iteration 6)...".to_string()));

    return Ok(());
}

#[tokio::test]
async fn it_respects_a_zero_iteration_ceiling() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let backend = ScriptedBackend::new(vec![]);
    let (tx, _rx) = mpsc::unbounded_channel::<Event>();

    let mut config = repair_config();
    config.max_iterations = 0;

    let repair_loop = RepairLoop::new(
        Box::new(backend.clone()),
        Box::new(ScriptedRunner::new(vec![])),
        ArtifactStore::new(dir.path().to_path_buf(), ".py"),
        config,
    );
    let session = repair_loop.run_session("never works", &tx).await?;

    assert_eq!(
        session.state,
        SessionState::Aborted(AbortReason::IterationLimitExceeded)
    );
    assert_eq!(session.generations, 1);

    return Ok(());
}

#[tokio::test]
async fn it_aborts_when_the_model_request_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let backend = ScriptedBackend::new(vec![Err(anyhow::anyhow!("connection refused"))]);
    let runner = ScriptedRunner::new(vec![]);
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    let repair_loop = RepairLoop::new(
        Box::new(backend.clone()),
        Box::new(runner.clone()),
        ArtifactStore::new(dir.path().to_path_buf(), ".py"),
        repair_config(),
    );
    let session = repair_loop.run_session("anything", &tx).await?;

    assert_eq!(
        session.state,
        SessionState::Aborted(AbortReason::Api("connection refused".to_string()))
    );
    assert_eq!(session.generations, 0);
    assert!(session.artifacts.is_empty());
    assert!(runner.executed.lock().unwrap().is_empty());
    assert_eq!(backend.requests().len(), 1);

    let messages = drain(&mut rx);
    assert_eq!(
        messages.last().unwrap(),
        &(
            MessageType::Error,
            "Error generating code: connection refused".to_string()
        )
    );

    return Ok(());
}

#[tokio::test]
async fn it_does_not_retry_a_failed_fix_request() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let backend = ScriptedBackend::new(vec![
        Ok(fenced("raise SystemExit('nope')")),
        Err(anyhow::anyhow!("rate limited")),
    ]);
    let runner = ScriptedRunner::new(vec![Ok(failing("nope\n"))]);
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    let repair_loop = RepairLoop::new(
        Box::new(backend.clone()),
        Box::new(runner),
        ArtifactStore::new(dir.path().to_path_buf(), ".py"),
        repair_config(),
    );
    let session = repair_loop.run_session("anything", &tx).await?;

    assert_eq!(
        session.abort_reason(),
        Some(&AbortReason::Api("rate limited".to_string()))
    );
    assert_eq!(backend.requests().len(), 2);
    assert_eq!(
        texts(&drain(&mut rx)).last().unwrap(),
        "Error generating fixed code: rate limited"
    );

    return Ok(());
}

#[tokio::test]
async fn it_aborts_when_the_code_cannot_be_saved() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory")?;

    let backend = ScriptedBackend::new(vec![Ok(fenced("print(1)"))]);
    let runner = ScriptedRunner::new(vec![]);
    let (tx, _rx) = mpsc::unbounded_channel::<Event>();

    let repair_loop = RepairLoop::new(
        Box::new(backend),
        Box::new(runner.clone()),
        ArtifactStore::new(blocker.join("programs"), ".py"),
        repair_config(),
    );
    let session = repair_loop.run_session("anything", &tx).await?;

    assert!(matches!(
        session.abort_reason(),
        Some(AbortReason::Filesystem(_))
    ));
    assert!(runner.executed.lock().unwrap().is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_aborts_when_the_interpreter_cannot_start() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let backend = ScriptedBackend::new(vec![Ok(fenced("print(1)"))]);
    let runner = ScriptedRunner::new(vec![Err(anyhow::anyhow!(
        "Failed to start interpreter 'python9'"
    ))]);
    let (tx, _rx) = mpsc::unbounded_channel::<Event>();

    let repair_loop = RepairLoop::new(
        Box::new(backend.clone()),
        Box::new(runner),
        ArtifactStore::new(dir.path().to_path_buf(), ".py"),
        repair_config(),
    );
    let session = repair_loop.run_session("anything", &tx).await?;

    assert_eq!(
        session.abort_reason(),
        Some(&AbortReason::Execution(
            "Failed to start interpreter 'python9'".to_string()
        ))
    );
    assert_eq!(session.artifacts.len(), 1);
    assert_eq!(backend.requests().len(), 1);

    return Ok(());
}

#[tokio::test]
async fn it_retries_a_timed_out_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let timeout_message = "Execution timed out after 30 seconds and was terminated.";
    let backend = ScriptedBackend::new(vec![
        Ok(fenced("while True:\n    pass")),
        Ok(fenced("print('done')")),
    ]);
    let runner = ScriptedRunner::new(vec![
        Ok(ExecutionResult {
            stderr: timeout_message.to_string(),
            timed_out: true,
            ..ExecutionResult::default()
        }),
        Ok(passing("done\n")),
    ]);
    let (tx, _rx) = mpsc::unbounded_channel::<Event>();

    let repair_loop = RepairLoop::new(
        Box::new(backend.clone()),
        Box::new(runner),
        ArtifactStore::new(dir.path().to_path_buf(), ".py"),
        repair_config(),
    );
    let session = repair_loop.run_session("loop forever", &tx).await?;

    assert_eq!(session.state, SessionState::Done);
    assert_eq!(session.generations, 2);
    assert!(backend.requests()[1][3].content.contains(timeout_message));

    return Ok(());
}

#[tokio::test]
async fn it_labels_generated_code_with_the_session_model() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let backend = ScriptedBackend::new(vec![Ok(fenced("print(1)"))]);
    let runner = ScriptedRunner::new(vec![Ok(passing("1\n"))]);
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    let repair_loop = RepairLoop::new(
        Box::new(backend),
        Box::new(runner),
        ArtifactStore::new(dir.path().to_path_buf(), ".py"),
        repair_config(),
    );
    repair_loop.run_session("print 1", &tx).await?;

    let mut labels = vec![];
    while let Ok(event) = rx.try_recv() {
        if let Event::SessionMessage(msg) = event {
            if msg.author == Author::Assistant {
                labels.push(msg.label().to_string());
            }
        }
    }

    assert_eq!(labels, vec!["gpt-4o-mini".to_string()]);

    return Ok(());
}

#[tokio::test]
async fn it_fails_when_nobody_listens() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    drop(rx);

    let repair_loop = RepairLoop::new(
        Box::new(ScriptedBackend::new(vec![])),
        Box::new(ScriptedRunner::new(vec![])),
        ArtifactStore::new(dir.path().to_path_buf(), ".py"),
        repair_config(),
    );

    assert!(repair_loop.run_session("anything", &tx).await.is_err());

    return Ok(());
}

#[test]
fn it_maps_suffixes_to_languages() {
    assert_eq!(language_for_suffix(".py"), "python");
    assert_eq!(language_for_suffix("js"), "javascript");
    assert_eq!(language_for_suffix(".lua"), "lua");
}

#[test]
fn it_writes_the_fix_prompt() {
    insta::assert_snapshot!(fix_prompt("NameError: x"), @r###"
    The previous code produced the following error:
    NameError: x
    Please provide a corrected version of the code.
    "###);
}
