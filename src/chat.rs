// ABOUTME: Interactive chat session driving the supervisor loop from the terminal.
// ABOUTME: Keeps the transcript across turns and re-equips expert tools per turn.

use std::path::PathBuf;
use std::sync::Arc;

use docsmith_agent::{
    AgentError, AgentLoop, ExpertDeps, SUPERVISOR_SYSTEM_PROMPT, TokenSink,
    build_supervisor_tools,
};
use docsmith_core::catalog::PackageRecord;
use docsmith_core::message::Message;

use crate::discovery::normalize_name;

/// One line of REPL input, classified.
#[derive(Debug, PartialEq)]
pub enum Command<'a> {
    /// A question for the agent.
    Ask(&'a str),
    /// Replace the enabled expert set.
    Use(Vec<String>),
    /// Show the catalog and which experts are enabled.
    ListPackages,
    Quit,
    Empty,
    Unknown(&'a str),
}

pub fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if !line.starts_with('/') {
        return Command::Ask(line);
    }

    let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match name {
        "/quit" | "/exit" => Command::Quit,
        "/packages" => Command::ListPackages,
        "/use" => Command::Use(
            rest.split(',')
                .map(normalize_name)
                .filter(|name| !name.is_empty())
                .collect(),
        ),
        _ => Command::Unknown(line),
    }
}

/// Packages enabled at session start: catalog entries whose name also appears
/// in the locally discovered dependency list, in catalog order.
pub fn default_enabled(catalog: &[PackageRecord], local: &[String]) -> Vec<String> {
    catalog
        .iter()
        .filter(|record| local.iter().any(|name| name == &record.package_name))
        .map(|record| record.package_name.clone())
        .collect()
}

/// A conversation with the supervisor agent.
///
/// The transcript persists across turns; each turn runs a fresh loop seeded
/// with the full history plus the new question. Tools are rebuilt per turn so
/// `/use` changes take effect on the very next question.
pub struct ChatSession {
    deps: ExpertDeps,
    catalog: Vec<PackageRecord>,
    enabled: Vec<String>,
    project_root: PathBuf,
    transcript: Vec<Message>,
}

impl ChatSession {
    pub fn new(
        deps: ExpertDeps,
        catalog: Vec<PackageRecord>,
        enabled: Vec<String>,
        project_root: PathBuf,
    ) -> Self {
        Self {
            deps,
            catalog,
            enabled,
            project_root,
            transcript: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &[PackageRecord] {
        &self.catalog
    }

    pub fn enabled(&self) -> &[String] {
        &self.enabled
    }

    pub fn set_enabled(&mut self, names: Vec<String>) {
        self.enabled = names;
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    fn supervisor_loop(&self) -> AgentLoop {
        let tools = build_supervisor_tools(
            &self.catalog,
            &self.enabled,
            &self.deps,
            &self.project_root,
        );
        AgentLoop::new(
            "supervisor",
            SUPERVISOR_SYSTEM_PROMPT,
            Arc::clone(&self.deps.gateway),
            tools,
        )
        .with_step_budget(self.deps.step_budget)
    }

    /// Run one turn. On failure the transcript is left untouched, so the
    /// question can simply be asked again.
    pub async fn ask(&mut self, question: &str) -> Result<String, AgentError> {
        let mut seed = self.transcript.clone();
        seed.push(Message::user(question));
        let outcome = self.supervisor_loop().run(seed).await?;
        self.transcript = outcome.messages;
        Ok(outcome.answer)
    }

    /// Like [`ask`](Self::ask), but delivers text deltas to `on_token` as the
    /// final answer is produced.
    pub async fn ask_streaming(
        &mut self,
        question: &str,
        on_token: TokenSink<'_>,
    ) -> Result<String, AgentError> {
        let mut seed = self.transcript.clone();
        seed.push(Message::user(question));
        let outcome = self.supervisor_loop().run_streaming(seed, on_token).await?;
        self.transcript = outcome.messages;
        Ok(outcome.answer)
    }
}
