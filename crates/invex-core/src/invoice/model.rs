//! Field extraction with a local language model.
//!
//! The model is an optional capability: when no command is configured, or
//! the configured program cannot be found, the strategy reports itself
//! unavailable and the coordinator skips it.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::rules::{parse_amount, FieldExtractor};
use super::{FieldStrategy, PartialRecord, PatternStrategy, Result};
use crate::error::ExtractionError;
use crate::models::config::{ExtractionConfig, ModelConfig};
use crate::models::result::{ExtractionMethod, InvoiceFields};

/// A text-completion model.
pub trait LanguageModel {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Complete the prompt and return the raw reply.
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Runs a local command, writing the prompt to stdin and reading the reply from stdout.
#[derive(Debug, Clone)]
pub struct CommandModel {
    program: String,
    args: Vec<String>,
    available: bool,
}

impl CommandModel {
    /// Build from `[program, args...]`; unavailable when empty or the program is not found.
    pub fn new(command: &[String]) -> Self {
        let Some((program, args)) = command.split_first() else {
            return Self {
                program: String::new(),
                args: Vec::new(),
                available: false,
            };
        };

        let available = program_exists(program);
        if available {
            info!("Language model command: {}", command.join(" "));
        } else {
            warn!("Language model program '{}' not found", program);
        }

        Self {
            program: program.clone(),
            args: args.to_vec(),
            available,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(&config.command)
    }
}

/// An explicit path that exists, or a bare name found on `PATH`.
fn program_exists(program: &str) -> bool {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

impl LanguageModel for CommandModel {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        if !self.available {
            return Err(ExtractionError::ModelUnavailable(
                "no model command configured".to_string(),
            ));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExtractionError::ModelUnavailable(format!("{}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .map_err(|e| ExtractionError::ModelResponse(format!("writing prompt: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ExtractionError::ModelResponse(e.to_string()))?;

        if !output.status.success() {
            return Err(ExtractionError::ModelResponse(format!(
                "{} exited with {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// The four fields as a model reports them; values may be strings, numbers or null.
#[derive(Debug, Default, Deserialize)]
struct ModelAnswer {
    #[serde(default)]
    invoice_date: Option<Value>,
    #[serde(default)]
    invoice_number: Option<Value>,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    due_date: Option<Value>,
}

fn value_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Cut the first JSON object out of a model reply.
///
/// Markdown fences are removed, the text from the first `{` to the first `}`
/// is kept, and a missing opening or closing brace is added.
pub fn clean_model_json(reply: &str) -> Option<String> {
    let stripped = reply.replace("```json", "").replace("```", "");
    let text = stripped.trim();
    if text.is_empty() {
        return None;
    }

    let body = match text.find('{') {
        Some(start) => {
            let rest = &text[start..];
            match rest.find('}') {
                Some(end) => rest[..=end].to_string(),
                None => format!("{}}}", rest),
            }
        }
        None => match text.find('}') {
            Some(end) => format!("{{{}", &text[..=end]),
            None => format!("{{{}}}", text),
        },
    };

    Some(body)
}

/// Asks a language model for the fields, then checks its answer with the pattern rules.
pub struct ModelStrategy<M: LanguageModel> {
    model: M,
    max_prompt_chars: usize,
    patterns: PatternStrategy,
}

impl<M: LanguageModel> ModelStrategy<M> {
    pub fn new(model: M) -> Self {
        Self::from_config(model, &ModelConfig::default(), &ExtractionConfig::default())
    }

    pub fn from_config(model: M, config: &ModelConfig, extraction: &ExtractionConfig) -> Self {
        Self {
            model,
            max_prompt_chars: config.max_prompt_chars,
            patterns: PatternStrategy::from_config(extraction),
        }
    }

    fn prompt(&self, text: &str) -> String {
        let excerpt: String = text.chars().take(self.max_prompt_chars).collect();
        format!(
            "Read the invoice below and answer with a single JSON object with the keys \
             invoice_date, invoice_number, amount and due_date. Dates are YYYY-MM-DD, \
             amount is a number, and unknown values are null.\n\nInvoice:\n{}\n",
            excerpt
        )
    }

    fn interpret(&self, reply: &str, text: &str) -> Option<PartialRecord> {
        let json = clean_model_json(reply)?;
        let answer: ModelAnswer = match serde_json::from_str(&json) {
            Ok(answer) => answer,
            Err(e) => {
                debug!("Model reply is not JSON ({}): {}", e, json);
                return None;
            }
        };

        let parser = self.patterns.dates().parser();
        let invoice_date = value_text(answer.invoice_date).and_then(|s| parser.parse(&s));
        let due_date = value_text(answer.due_date).and_then(|s| parser.parse(&s));
        let amount = value_text(answer.amount)
            .and_then(|s| parse_amount(&s))
            .filter(|a| self.patterns.amounts().is_plausible(*a));
        let invoice_number = value_text(answer.invoice_number)
            .filter(|n| self.patterns.numbers().is_acceptable(n));

        // Corroborated when the pattern rules find the same number in the text.
        let invoice_number_validated = invoice_number.as_deref().is_some_and(|n| {
            self.patterns
                .numbers()
                .extract_all(text)
                .iter()
                .any(|m| m.value.eq_ignore_ascii_case(n))
        });

        Some(PartialRecord {
            fields: InvoiceFields {
                invoice_date,
                invoice_number,
                amount,
                due_date,
            },
            invoice_number_validated,
        })
    }
}

impl<M: LanguageModel> FieldStrategy for ModelStrategy<M> {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::ModelAssisted
    }

    fn is_available(&self) -> bool {
        self.model.is_available()
    }

    fn attempt(&self, text: &str) -> PartialRecord {
        let reply = match self.model.complete(&self.prompt(text)) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("{} failed: {}", self.model.name(), e);
                return PartialRecord::default();
            }
        };

        let record = self.interpret(&reply, text).unwrap_or_default();
        debug!(
            fields = record.present_count(),
            "Model extraction: {:?}", record.fields
        );
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::cell::RefCell;
    use std::str::FromStr;

    /// Returns a canned reply and records the prompt it was given.
    struct CannedModel {
        reply: Result<String>,
        prompt: RefCell<String>,
    }

    impl CannedModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompt: RefCell::new(String::new()),
            }
        }
    }

    impl LanguageModel for CannedModel {
        fn name(&self) -> &str {
            "canned"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn complete(&self, prompt: &str) -> Result<String> {
            *self.prompt.borrow_mut() = prompt.to_string();
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(_) => Err(ExtractionError::ModelResponse("canned failure".to_string())),
            }
        }
    }

    #[test]
    fn test_clean_model_json() {
        assert_eq!(
            clean_model_json("Sure!\n```json\n{\"invoice_number\": \"A100\"}\n```").as_deref(),
            Some("{\"invoice_number\": \"A100\"}")
        );
        assert_eq!(
            clean_model_json("\"amount\": 10.5}").as_deref(),
            Some("{\"amount\": 10.5}")
        );
        assert_eq!(
            clean_model_json("{\"amount\": 10.5").as_deref(),
            Some("{\"amount\": 10.5}")
        );
        assert_eq!(
            clean_model_json("{\"a\": 1} and {\"b\": 2}").as_deref(),
            Some("{\"a\": 1}")
        );
        assert_eq!(clean_model_json("   "), None);
    }

    #[test]
    fn test_model_answer_is_checked() {
        let model = CannedModel::replying(
            r#"Here you go: {"invoice_date": "2015-12-12", "invoice_number": "1164006105",
               "amount": 108.82, "due_date": "tomorrow"}"#,
        );
        let strategy = ModelStrategy::new(model);
        let record = strategy.attempt("Invoice #1164006105 total $108.82");

        assert_eq!(
            record.fields,
            InvoiceFields {
                invoice_date: NaiveDate::from_ymd_opt(2015, 12, 12),
                invoice_number: Some("1164006105".to_string()),
                amount: Some(Decimal::from_str("108.82").unwrap()),
                due_date: None,
            }
        );
        assert!(record.invoice_number_validated);
    }

    #[test]
    fn test_uncorroborated_number_not_validated() {
        let model = CannedModel::replying(r#"{"invoice_number": "ZZ-999", "amount": "5000000"}"#);
        let record = ModelStrategy::new(model).attempt("nothing useful");

        assert_eq!(record.fields.invoice_number.as_deref(), Some("ZZ-999"));
        assert_eq!(record.fields.amount, None);
        assert!(!record.invoice_number_validated);
    }

    #[test]
    fn test_garbage_reply_is_empty_record() {
        let record = ModelStrategy::new(CannedModel::replying("I cannot help with that")).attempt("x");
        assert!(record.is_empty());
    }

    #[test]
    fn test_model_failure_is_empty_record() {
        let model = CannedModel {
            reply: Err(ExtractionError::ModelUnavailable("down".to_string())),
            prompt: RefCell::new(String::new()),
        };
        assert!(ModelStrategy::new(model).attempt("Invoice #1001").is_empty());
    }

    #[test]
    fn test_prompt_is_truncated() {
        let strategy = ModelStrategy::new(CannedModel::replying("{}"));
        let text = "y".repeat(5000);
        strategy.attempt(&text);

        let prompt = strategy.model.prompt.borrow();
        assert!(prompt.contains(&"y".repeat(1500)));
        assert!(!prompt.contains(&"y".repeat(1501)));
    }

    #[test]
    fn test_unconfigured_command_is_unavailable() {
        let model = CommandModel::new(&[]);
        assert!(!model.is_available());
        assert!(model.complete("prompt").is_err());

        let missing = CommandModel::new(&["/nonexistent/llm-binary".to_string()]);
        assert!(!missing.is_available());
    }
}
