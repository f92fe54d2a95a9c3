//! Operator console used by the human-prompt tool

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;

/// Somewhere a question can be shown to a person and one line read back
#[async_trait]
pub trait Console: Send + Sync {
    /// Show `question` and wait for one line; `None` on end of input
    async fn ask(&self, question: &str) -> std::io::Result<Option<String>>;
}

/// Console on the process's stdin/stdout
///
/// Each answer is read on its own OS thread. A run that is cancelled while a
/// question is open drops the receiver and leaves the thread parked on stdin,
/// so shutdown never waits for the operator to press Enter.
#[derive(Debug, Default)]
pub struct StdConsole;

impl StdConsole {
    pub fn new() -> Self {
        Self
    }
}

fn read_answer() -> std::io::Result<Option<String>> {
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

#[async_trait]
impl Console for StdConsole {
    async fn ask(&self, question: &str) -> std::io::Result<Option<String>> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(b"----- Human Input Required -----\n").await?;
        stdout.write_all(format!("{} ", question).as_bytes()).await?;
        stdout.flush().await?;

        let (tx, rx) = oneshot::channel();
        std::thread::Builder::new()
            .name("dynloop-stdin".to_string())
            .spawn(move || {
                let _ = tx.send(read_answer());
            })?;

        rx.await
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin reader exited"))?
    }
}

/// Console that replays canned answers, for tests and non-interactive runs
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    answers: Mutex<VecDeque<String>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedConsole {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Console for ScriptedConsole {
    async fn ask(&self, question: &str) -> std::io::Result<Option<String>> {
        if let Ok(mut questions) = self.questions.lock() {
            questions.push(question.to_string());
        }
        Ok(self.answers.lock().ok().and_then(|mut a| a.pop_front()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_console_replays_then_eof() {
        let console = ScriptedConsole::new(["Boston", "noon"]);

        assert_eq!(console.ask("Which city?").await.unwrap().as_deref(), Some("Boston"));
        assert_eq!(console.ask("What time?").await.unwrap().as_deref(), Some("noon"));
        assert_eq!(console.ask("Anything else?").await.unwrap(), None);

        assert_eq!(console.questions(), vec!["Which city?", "What time?", "Anything else?"]);
    }
}
