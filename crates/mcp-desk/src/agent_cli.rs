//! Built-in agent child.
//!
//! Launched by the console once per prompt. Reads the prompt from stdin,
//! starts the Playwright tool server over stdio and lets the hosted agent
//! drive it: each model turn either answers in text or asks for tool calls,
//! which are executed and fed back until the model answers. Progress goes to
//! stdout in the shape the console classifies; diagnostics go to stderr. A
//! failed run exits non-zero so the console reports it as an agent error.

use std::io::{self, Write};

use chrono::Local;
use desk_core::hosted_agent::{self, AgentReply, AgentSettings, HostedAgentError, ToolCall};
use desk_core::transcript::{self, COMPLETION_LINE};
use desk_core::DeskConfig;
use desk_runtime::{McpClient, ToolOutput};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Produces the next assistant turn.
trait ChatModel {
    async fn complete(
        &self,
        messages: &[Value],
        tools: &[Value],
    ) -> std::result::Result<AgentReply, HostedAgentError>;
}

/// Executes the tools the model asks for.
trait ToolHost {
    /// Tool set in chat-completions function form.
    fn function_tools(&self) -> Vec<Value>;

    async fn call(&self, call: &ToolCall) -> desk_runtime::Result<ToolOutput>;
}

struct HostedModel {
    client: reqwest::Client,
    settings: AgentSettings,
}

impl ChatModel for HostedModel {
    async fn complete(
        &self,
        messages: &[Value],
        tools: &[Value],
    ) -> std::result::Result<AgentReply, HostedAgentError> {
        hosted_agent::complete(&self.client, &self.settings, messages, tools).await
    }
}

impl ToolHost for McpClient {
    fn function_tools(&self) -> Vec<Value> {
        self.tools()
            .iter()
            .map(|t| hosted_agent::function_tool(&t.name, t.description.as_deref(), &t.input_schema))
            .collect()
    }

    async fn call(&self, call: &ToolCall) -> desk_runtime::Result<ToolOutput> {
        self.call_tool(&call.name, call.arguments.clone()).await
    }
}

/// Run the agent child to completion.
pub fn execute(config: &DeskConfig) -> Result<()> {
    let raw = transcript::read_prompt()?;
    let prompt = transcript::prepare_prompt(&raw, Local::now());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out)?;
    writeln!(out, "{}", transcript::user_header(&prompt))?;
    out.flush()?;

    // Fail before paying for a tool server launch.
    if config.agent.api_key.is_none() {
        error!("agent run failed: {}", HostedAgentError::NoApiKey);
        return Err(HostedAgentError::NoApiKey.into());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime
        .block_on(async {
            let server = config.tool_server_command();
            info!(server = %server, model = %config.agent.model, "starting agent run");
            let tools = McpClient::start(&server).await?;
            let model = HostedModel {
                client: reqwest::Client::new(),
                settings: config.agent.clone(),
            };
            drive(&model, &tools, &prompt, config.agent.max_steps, &mut out).await
        })
        .map_err(|e| {
            error!(error = %e, "agent run failed");
            e
        })?;

    writeln!(out)?;
    writeln!(out, "{}", COMPLETION_LINE)?;
    out.flush()?;
    Ok(())
}

/// Alternate model turns and tool execution until the model answers.
///
/// Tool failures the server reports are handed back to the model; a broken
/// tool server or model endpoint ends the run.
async fn drive<M: ChatModel, T: ToolHost, W: Write>(
    model: &M,
    tools: &T,
    prompt: &str,
    max_steps: usize,
    out: &mut W,
) -> Result<()> {
    let functions = tools.function_tools();
    let mut messages = hosted_agent::initial_messages(prompt);

    for step in 1..=max_steps {
        let reply = model.complete(&messages, &functions).await?;
        write_text(out, &reply)?;
        messages.push(reply.message.clone());

        if reply.is_final() {
            debug!(step, "agent answered");
            return Ok(());
        }

        let mut records = Vec::with_capacity(reply.tool_calls.len());
        for (call, raw) in reply.calls()?.iter().zip(&reply.tool_calls) {
            let output = tools.call(call).await?;
            let content = if output.is_error {
                warn!(tool = %call.name, "tool reported failure");
                format!("Error: {}", output.text)
            } else {
                output.text
            };
            messages.push(hosted_agent::tool_result_message(&call.id, &content));

            let mut record = raw.clone();
            record["output"] = Value::String(content);
            records.push(record);
        }

        write_step(out, &records)?;
        debug!(step, calls = records.len(), "tool step completed");
    }

    Err(format!("no final answer after {} tool steps", max_steps).into())
}

/// Print assistant text line by line.
fn write_text<W: Write>(out: &mut W, reply: &AgentReply) -> Result<()> {
    if let Some(text) = &reply.text {
        for line in text.lines() {
            writeln!(out, "{}", line)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// One marker line per completed tool step.
fn write_step<W: Write>(out: &mut W, records: &[Value]) -> Result<()> {
    let data = serde_json::to_string(records)?;
    writeln!(out)?;
    writeln!(out, "{}", transcript::tool_calls_line(&data))?;
    out.flush()?;
    Ok(())
}
