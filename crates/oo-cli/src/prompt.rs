//! Interactive prompts for workflow input and target selection

use crate::display::rule;
use crate::input::convert_input_value;
use colored::Colorize;
use oo_client::OuroborosClient;
use oo_core::{display_value, InputField, JsonMap, Result};
use serde_json::Value;
use std::io::{self, BufRead, Read, Stdout, Write};

/// Line-oriented prompter over any reader and writer
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Show `prompt` and read one trimmed line; `None` at end of input
    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Yes/no question, defaulting to no
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{} (y/N): ", question))?;
        Ok(matches!(
            answer.map(|a| a.to_lowercase()).as_deref(),
            Some("y") | Some("yes")
        ))
    }

    /// Pick one of `count` numbered entries; returns a 0-based index
    pub fn choose(&mut self, count: usize) -> Result<Option<usize>> {
        let Some(answer) = self.ask(&format!("\nSelect target (1-{}): ", count))? else {
            return Ok(None);
        };
        Ok(answer
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=count).contains(n))
            .map(|n| n - 1))
    }

    /// Ask for every declared input field of a workflow
    ///
    /// Each value is checked by the server before it is accepted. Returns
    /// `None` when the schema cannot be fetched, input ends early, or the
    /// user declines the final confirmation.
    pub async fn collect_workflow_input(
        &mut self,
        client: &OuroborosClient,
        slug: &str,
    ) -> Result<Option<JsonMap>> {
        writeln!(self.output, "🎯 Collecting input for workflow: {}", slug)?;
        writeln!(self.output, "{}", rule())?;

        let fields = match client.get_workflow_input_fields(slug).await {
            Ok(fields) => fields.input_fields,
            Err(e) => {
                writeln!(
                    self.output,
                    "{} {}",
                    "❌ Could not retrieve input field schema:".red(),
                    e
                )?;
                return Ok(None);
            }
        };

        if fields.is_empty() {
            writeln!(
                self.output,
                "{}",
                "✅ No input fields required for this workflow".green()
            )?;
            return Ok(Some(JsonMap::new()));
        }

        writeln!(self.output, "📋 Found {} input field(s) to collect:", fields.len())?;
        writeln!(self.output)?;

        let mut collected = JsonMap::new();
        for field in &fields {
            self.describe_field(field)?;
            match self.collect_field(client, slug, field).await? {
                FieldOutcome::Value(value) => {
                    collected.insert(field.key().to_string(), value);
                }
                FieldOutcome::Skipped => {}
                FieldOutcome::Cancelled => {
                    writeln!(self.output, "{}", "❌ Input collection cancelled".red())?;
                    return Ok(None);
                }
            }
            writeln!(self.output)?;
        }

        writeln!(self.output, "📋 Collected Input Summary:")?;
        writeln!(self.output, "{}", "=".repeat(40))?;
        for (key, value) in &collected {
            writeln!(self.output, "   {}: {}", key, display_value(value))?;
        }
        writeln!(self.output)?;

        if !self.confirm("✅ Proceed with these inputs?")? {
            writeln!(self.output, "{}", "❌ Input collection cancelled".red())?;
            return Ok(None);
        }

        writeln!(self.output, "{}", "✅ Input collection completed".green())?;
        Ok(Some(collected))
    }

    fn describe_field(&mut self, field: &InputField) -> Result<()> {
        let label = if field.is_required() {
            "🔴 REQUIRED".red().bold()
        } else {
            "🟡 OPTIONAL".yellow()
        };
        writeln!(self.output, "📝 {} Field: {}", label, field.key())?;
        writeln!(self.output, "   Type: {}", field.kind())?;
        if let Some(description) = field.describe() {
            writeln!(self.output, "   Description: {}", description)?;
        }
        if let Some(example) = field.example() {
            writeln!(self.output, "   Example: {}", example)?;
        }
        if let Some(default) = field.default_value() {
            writeln!(self.output, "   Default: {}", display_value(&default))?;
        }
        writeln!(self.output)?;
        Ok(())
    }

    async fn collect_field(
        &mut self,
        client: &OuroborosClient,
        slug: &str,
        field: &InputField,
    ) -> Result<FieldOutcome> {
        let name = field.key();
        let required = field.is_required();
        let prompt = if required {
            format!("Enter value for '{}': ", name)
        } else {
            format!("Enter value for '{}' (press Enter to skip): ", name)
        };

        loop {
            let Some(raw) = self.ask(&prompt)? else {
                return Ok(FieldOutcome::Cancelled);
            };

            if raw.is_empty() {
                if required {
                    writeln!(
                        self.output,
                        "{}",
                        "❌ This field is required. Please provide a value.".red()
                    )?;
                    continue;
                }
                return match field.default_value() {
                    Some(default) => {
                        writeln!(
                            self.output,
                            "✅ Using default value: {}",
                            display_value(&default)
                        )?;
                        Ok(FieldOutcome::Value(default))
                    }
                    None => {
                        writeln!(self.output, "✅ Skipped optional field")?;
                        Ok(FieldOutcome::Skipped)
                    }
                };
            }

            let Some(value) = convert_input_value(&raw, field.kind()) else {
                writeln!(
                    self.output,
                    "{}",
                    format!("❌ Invalid value for type '{}'. Please try again.", field.kind()).red()
                )?;
                continue;
            };

            let mut probe = JsonMap::new();
            probe.insert(name.to_string(), value.clone());

            match client.validate_workflow_input(slug, &probe).await {
                Ok(result) if result.was_checked() => {
                    if result.is_valid() {
                        writeln!(self.output, "{}", "✅ Input validated successfully".green())?;
                        return Ok(FieldOutcome::Value(value));
                    }
                    writeln!(
                        self.output,
                        "{} {}",
                        "❌ Validation failed:".red(),
                        result.field_errors(name).join(", ")
                    )?;
                }
                Ok(_) | Err(_) => {
                    writeln!(
                        self.output,
                        "{}",
                        "⚠️  Could not validate input, accepting value".yellow()
                    )?;
                    return Ok(FieldOutcome::Value(value));
                }
            }
        }
    }
}

/// Reader whose blocking reads run under `tokio::task::block_in_place`
///
/// Needs the multi-threaded runtime.
pub struct BlockingReader<R>(R);

impl<R: Read> Read for BlockingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let inner = &mut self.0;
        tokio::task::block_in_place(move || inner.read(buf))
    }
}

impl<R: BufRead> BufRead for BlockingReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let inner = &mut self.0;
        tokio::task::block_in_place(move || {
            let inner = inner;
            inner.fill_buf()
        })
    }

    fn consume(&mut self, amt: usize) {
        self.0.consume(amt)
    }
}

impl Prompter<BlockingReader<io::StdinLock<'static>>, Stdout> {
    /// Prompter on the terminal, for use inside the runtime
    pub fn terminal() -> Self {
        Self::new(BlockingReader(io::stdin().lock()), io::stdout())
    }
}

enum FieldOutcome {
    Value(Value),
    Skipped,
    Cancelled,
}
