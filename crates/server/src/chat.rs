//! Interactive terminal chat with slash commands.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use babelfish_mcp::ToolRouter;
use chess_analysis::Engine;

use crate::agent::{preview, Agent, Conversation, DebugEvent, DebugLog, CHAT_MAX_ITERATIONS};
use crate::clients::openrouter::{Message, ModelInfo, OpenRouterClient};

const POPULAR_MODELS: [&str; 6] = [
    "anthropic/claude-3.5-sonnet",
    "anthropic/claude-3-haiku",
    "openai/gpt-4o",
    "openai/gpt-4o-mini",
    "meta-llama/llama-3.1-8b-instruct",
    "google/gemini-pro",
];
const HISTORY_SHOWN: usize = 10;
const HISTORY_PREVIEW: usize = 200;
const TOOL_DESCRIPTION_PREVIEW: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Models,
    Tools,
    Reset,
    History,
    Model(String),
    Quit,
    Unknown(String),
}

impl Command {
    /// `None` means the input is a message for the model.
    pub fn parse(input: &str) -> Option<Command> {
        let input = input.trim();
        if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "q") {
            return Some(Command::Quit);
        }
        if !input.starts_with('/') {
            return None;
        }

        let (word, rest) = match input.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (input, ""),
        };
        let command = match word.to_lowercase().as_str() {
            "/help" => Command::Help,
            "/models" => Command::Models,
            "/tools" => Command::Tools,
            "/reset" => Command::Reset,
            "/history" => Command::History,
            "/model" if !rest.is_empty() => Command::Model(rest.to_string()),
            _ => Command::Unknown(input.to_string()),
        };
        Some(command)
    }
}

pub fn help_text() -> String {
    let rows = [
        ("/help", "Show this help message"),
        ("/models", "List available models"),
        ("/tools", "List available chess tools"),
        ("/reset", "Reset conversation history"),
        ("/history", "Show conversation history"),
        ("/model <name>", "Change the current model"),
        ("quit/exit/q", "Exit the chat"),
    ];
    let mut text = String::from("Available commands:\n");
    for (command, description) in rows {
        text.push_str(&format!("  {command:<15} {description}\n"));
    }
    text
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn models_text(models: &[ModelInfo], current: &str) -> String {
    let mut text = String::from("Popular models for chess:\n");
    for model in models.iter().filter(|m| POPULAR_MODELS.contains(&m.id.as_str())) {
        let context = model
            .context_length
            .map(group_thousands)
            .unwrap_or_else(|| "Unknown".to_string());
        text.push_str(&format!(
            "  {:<36} {:<32} {}\n",
            model.id,
            model.name.as_deref().unwrap_or(""),
            context
        ));
    }
    text.push_str(&format!("Current model: {current}\n"));
    text.push_str(&format!("Total available models: {}", models.len()));
    text
}

pub fn history_text(conversation: &Conversation) -> String {
    let history: Vec<&Message> = conversation.history().collect();
    if history.is_empty() {
        return "No conversation history".to_string();
    }

    let start = history.len().saturating_sub(HISTORY_SHOWN);
    let mut text = String::from("Conversation history:\n");
    for (i, msg) in history[start..].iter().enumerate() {
        let mut line = preview(msg.content(), HISTORY_PREVIEW);
        let calls = msg.tool_call_count();
        if calls > 0 {
            line.push_str(&format!(" [Tool calls: {calls}]"));
        }
        text.push_str(&format!("{}. {}: {}\n", i + 1, capitalize(msg.role()), line));
    }
    text
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub struct ChatSession<E> {
    agent: Agent<E, OpenRouterClient>,
    conversation: Conversation,
}

impl<E: Engine> ChatSession<E> {
    pub fn new(router: ToolRouter<E>, client: OpenRouterClient, model_name: &str) -> Self {
        Self {
            agent: Agent::new(router, Arc::new(client), model_name, CHAT_MAX_ITERATIONS),
            conversation: Conversation::new(),
        }
    }

    fn tools_text(&self) -> String {
        let mut text = String::from("Available tools:\n");
        for spec in self.agent.router().tools() {
            text.push_str(&format!(
                "  {:<24} {}\n",
                spec.name,
                preview(spec.description, TOOL_DESCRIPTION_PREVIEW)
            ));
        }
        text
    }

    /// Returns `false` when the session should end.
    async fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Quit => {
                println!("Goodbye!");
                return false;
            }
            Command::Help => println!("{}", help_text()),
            Command::Tools => println!("{}", self.tools_text()),
            Command::Reset => {
                self.conversation.reset();
                println!("Conversation reset");
            }
            Command::History => println!("{}", history_text(&self.conversation)),
            Command::Model(name) => {
                println!("Model set to: {name}");
                self.agent.set_model_name(name);
            }
            Command::Models => {
                let bar = spinner("Fetching models...");
                let result = self.agent.model().list_models().await;
                bar.finish_and_clear();
                match result {
                    Ok(models) if !models.is_empty() => {
                        println!("{}", models_text(&models, self.agent.model_name()))
                    }
                    Ok(_) => println!("Failed to fetch models"),
                    Err(e) => {
                        error!(error = %e, "Model listing failed");
                        println!("Failed to fetch models: {e}");
                    }
                }
            }
            Command::Unknown(text) => println!("Unknown command: {text}"),
        }
        true
    }

    async fn send(&mut self, input: &str) {
        let mut log = DebugLog::default();
        let bar = spinner("Thinking...");
        let result = self
            .agent
            .run_turn(&mut self.conversation, input, &mut log)
            .await;
        bar.finish_and_clear();

        for entry in log.entries() {
            match &entry.event {
                DebugEvent::AiResponse { content, .. } if !content.trim().is_empty() => {
                    println!("\nAssistant: {content}");
                }
                DebugEvent::ToolCall {
                    tool_name,
                    arguments,
                    ..
                } => {
                    println!("🔧 Executing tool: {tool_name}");
                    println!("   Arguments: {arguments}");
                }
                DebugEvent::Error { error } => println!("Error: {error}"),
                _ => {}
            }
        }

        match result {
            Ok(outcome) if outcome.exhausted => {
                println!("Maximum iterations ({CHAT_MAX_ITERATIONS}) reached.");
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Chat turn failed"),
        }
    }

    pub async fn run(&mut self) -> std::io::Result<()> {
        println!("🐟 Babelfish Chat");
        println!("Model: {}", self.agent.model_name());
        println!("Available tools: {}", self.agent.router().tools().len());
        println!("Type 'quit', 'exit', or 'q' to end the conversation.");
        println!("Type '/help' for available commands.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("\nYou: ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!();
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match Command::parse(input) {
                Some(command) => {
                    if !self.handle_command(command).await {
                        break;
                    }
                }
                None => self.send(input).await,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("hello there"), None);
        assert_eq!(Command::parse("Q"), Some(Command::Quit));
        assert_eq!(Command::parse(" exit "), Some(Command::Quit));
        assert_eq!(Command::parse("/HELP"), Some(Command::Help));
        assert_eq!(Command::parse("/history"), Some(Command::History));
        assert_eq!(
            Command::parse("/model openai/GPT-4o"),
            Some(Command::Model("openai/GPT-4o".into()))
        );
        assert_eq!(Command::parse("/model"), Some(Command::Unknown("/model".into())));
        assert_eq!(Command::parse("/foo"), Some(Command::Unknown("/foo".into())));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(200000), "200,000");
        assert_eq!(group_thousands(1048576), "1,048,576");
    }

    #[test]
    fn test_models_text_filters_popular() {
        let models = vec![
            ModelInfo {
                id: "openai/gpt-4o".into(),
                name: Some("GPT-4o".into()),
                context_length: Some(128000),
            },
            ModelInfo {
                id: "someone/obscure".into(),
                name: None,
                context_length: None,
            },
        ];
        let text = models_text(&models, "openai/gpt-4o");
        assert!(text.contains("128,000"));
        assert!(!text.contains("someone/obscure"));
        assert!(text.ends_with("Total available models: 2"));
    }

    #[test]
    fn test_history_text() {
        let mut conv = Conversation::new();
        assert_eq!(history_text(&conv), "No conversation history");

        conv.push(Message::User {
            content: "x".repeat(300),
        });
        conv.push(Message::Assistant {
            content: None,
            tool_calls: vec![crate::clients::openrouter::ToolCall {
                id: "c1".into(),
                kind: "function".into(),
                function: crate::clients::openrouter::FunctionCall {
                    name: "visualize_board".into(),
                    arguments: "{}".into(),
                },
            }],
        });
        let text = history_text(&conv);
        assert!(text.contains(&format!("1. User: {}...", "x".repeat(200))));
        assert!(text.contains("2. Assistant:  [Tool calls: 1]"));
    }
}
