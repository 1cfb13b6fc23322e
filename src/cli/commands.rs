//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::agent::Agent;
use crate::core::{Config, Result, ShowroomError};
use crate::tools::dealership::Dealership;

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// Clear history
    Clear,
    /// No output needed
    None,
}

/// Parse and handle special commands
pub fn handle_command(
    input: &str,
    agent: &mut Agent,
    dealership: &Dealership,
) -> Result<CommandResult> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(CommandResult::None);
    }

    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0].trim_start_matches('/').to_lowercase();

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "clear" | "reset" => {
            agent.clear_history();
            Ok(CommandResult::Clear)
        }

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "status" => {
            let config = agent.config();
            let status = format!(
                "Showroom Status:\n\
                 ─────────────────────────────\n\
                 Endpoint:       {}\n\
                 Model:          {}\n\
                 Gateway:        {}\n\
                 Tenant:         {}\n\
                 Session:        {}\n\
                 Max iterations: {}\n\
                 History:        {} turns\n\
                 Inventory:      {} vehicles",
                config.gateway.base_url,
                config.gateway.model,
                agent.gateway_name(),
                agent.execution().tenant_id,
                agent.execution().session_id,
                config.agent.max_iterations,
                agent.history_len(),
                dealership.inventory.len(),
            );
            Ok(CommandResult::Handled(status))
        }

        "tools" => {
            let output = format!(
                "Tools offered to the model:\n{}",
                agent
                    .tool_names()
                    .iter()
                    .map(|name| format!("  - {}", name))
                    .collect::<Vec<_>>()
                    .join("\n")
            );
            Ok(CommandResult::Handled(output))
        }

        "appointments" => {
            let booked = dealership.appointments.all();
            if booked.is_empty() {
                return Ok(CommandResult::Handled("No appointments booked.".to_string()));
            }
            let output = booked
                .iter()
                .map(|a| {
                    format!(
                        "  {} {} {} {} {} ({})",
                        a.id, a.date, a.time, a.kind, a.vehicle_id, a.customer_name
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            Ok(CommandResult::Handled(format!("Appointments:\n{}", output)))
        }

        "config" => {
            let current = toml::to_string_pretty(agent.config())
                .map_err(|e| ShowroomError::config(format!("Failed to serialize config: {}", e)))?;
            Ok(CommandResult::Handled(format!(
                "# {}\n{}",
                Config::config_file().display(),
                current
            )))
        }

        "save" => {
            let path = agent.config().save()?;
            Ok(CommandResult::Handled(format!(
                "Configuration saved to {}",
                path.display()
            )))
        }

        _ => {
            // Not a command, treat as normal input
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

/// Generate help text
fn help_text() -> String {
    r#"Showroom Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit
  clear, reset     Clear conversation history
  status           Show endpoint, model and session
  tools            List the tools offered to the model
  appointments     List appointments booked this session
  config           Show the configuration in use
  save             Write the current configuration to disk

Anything else is sent to the assistant as a customer message.
─────────────────────────────────────────────"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedGateway;
    use crate::tools::dealership::Inventory;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (Agent, Dealership) {
        let dealership = Dealership::new(Inventory::sample());
        let executor = dealership.toolset(Duration::from_secs(5)).unwrap();
        let agent = Agent::with_gateway(
            Config::default(),
            Arc::new(ScriptedGateway::default()),
            executor,
            "cli",
        );
        (agent, dealership)
    }

    #[test]
    fn test_exit_and_clear() {
        let (mut agent, dealership) = setup();
        assert_eq!(
            handle_command("quit", &mut agent, &dealership).unwrap(),
            CommandResult::Exit
        );
        assert_eq!(
            handle_command("/clear", &mut agent, &dealership).unwrap(),
            CommandResult::Clear
        );
    }

    #[test]
    fn test_plain_text_is_passed_through() {
        let (mut agent, dealership) = setup();
        assert_eq!(
            handle_command("any automatic SUVs?", &mut agent, &dealership).unwrap(),
            CommandResult::Continue("any automatic SUVs?".to_string())
        );
    }

    #[test]
    fn test_unknown_slash_command() {
        let (mut agent, dealership) = setup();
        match handle_command("/frobnicate", &mut agent, &dealership).unwrap() {
            CommandResult::Handled(text) => assert!(text.contains("Unknown command")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_config_shows_values_in_use() {
        let dealership = Dealership::new(Inventory::sample());
        let executor = dealership.toolset(Duration::from_secs(5)).unwrap();
        let mut config = Config::default();
        config.gateway.model = "showroom-test-model".to_string();
        let mut agent = Agent::with_gateway(
            config,
            Arc::new(ScriptedGateway::default()),
            executor,
            "cli",
        );

        match handle_command("config", &mut agent, &dealership).unwrap() {
            CommandResult::Handled(text) => assert!(text.contains("showroom-test-model")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tools_lists_catalog() {
        let (mut agent, dealership) = setup();
        match handle_command("tools", &mut agent, &dealership).unwrap() {
            CommandResult::Handled(text) => {
                assert!(text.contains("search_inventory"));
                assert!(text.contains("schedule_appointment"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
