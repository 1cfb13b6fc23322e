//! Interactive REPL for Showroom
//!
//! Plays the customer side of a chat: each line is one inbound message, each
//! reply is printed together with any photos the tools queued.

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::agent::{Agent, AgentReply};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::Result;
use crate::tools::dealership::Dealership;

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    agent: Agent,
    dealership: Dealership,
}

impl Repl {
    /// Create a REPL around an agent and the stores its tools write to
    pub fn new(agent: Agent, dealership: Dealership) -> Self {
        Self { agent, dealership }
    }

    /// Handle one message and print the reply
    pub async fn respond(&mut self, input: &str) -> AgentReply {
        let reply = self.agent.process(input).await;
        debug!(
            gateway_calls = reply.gateway_calls,
            tool_calls = reply.tool_calls,
            total_tokens = reply.usage.total_tokens,
            "reply ready"
        );

        println!("\nAssistant:\n{}\n", reply.text);
        for media in self
            .dealership
            .outbox
            .drain(&self.agent.execution().session_id)
        {
            println!("  [photo] {} {}", media.caption, media.url);
        }

        reply
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            // Print prompt
            print!("You: ");
            stdout.flush()?;

            // Read input
            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();

            if input.is_empty() {
                continue;
            }

            // Handle commands
            match handle_command(input, &mut self.agent, &self.dealership) {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Clear) => {
                    println!("Conversation cleared.\n");
                    continue;
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                    continue;
                }
                Ok(CommandResult::None) => continue,
                Ok(CommandResult::Continue(input)) => {
                    self.respond(&input).await;
                }
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        Ok(())
    }

    /// Print the startup banner
    fn print_banner(&self) {
        let config = self.agent.config();

        println!();
        println!("Showroom - dealership chat assistant");
        println!("─────────────────────────────────────────────");
        println!("Endpoint:  {}", config.gateway.base_url);
        println!("Model:     {}", config.gateway.model);
        println!("Tenant:    {}", self.agent.execution().tenant_id);
        println!("Inventory: {} vehicles", self.dealership.inventory.len());
        println!();
        println!("Commands: help, clear, status, tools, appointments, exit");
        println!("─────────────────────────────────────────────");
    }
}
