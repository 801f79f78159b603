//! Discord bot commands (!register, !approve, !deny).
//!
//! Registration links a Discord account to an in-game character name.
//! Anyone can ask; an admin resolves the request by its code.

use tracing::{debug, info};

use crate::game::sanitize_name;
use crate::store::{RegistrationStatus, RegistrationStore, UserStore};

/// Commands longer than this are treated as chat.
const MAX_COMMAND_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `!register <character>`
    Register { character: String },
    /// `!approve <code>`
    Approve { code: String },
    /// `!deny <code>`
    Deny { code: String },
}

impl Command {
    /// Parse a message body. Returns `None` for anything that is not a
    /// known command, so it can be relayed as chat instead.
    pub fn parse(content: &str) -> Option<Self> {
        let content = content.trim();
        if content.len() > MAX_COMMAND_LEN || !content.starts_with('!') {
            return None;
        }

        let parts: Vec<&str> = content[1..].splitn(2, ' ').collect();
        let command = parts[0].to_lowercase();
        let args = parts.get(1).map(|s| s.trim()).unwrap_or_default();

        match command.as_str() {
            "register" => Some(Command::Register {
                character: sanitize_name(args),
            }),
            "approve" => Some(Command::Approve {
                code: args.to_string(),
            }),
            "deny" => Some(Command::Deny {
                code: args.to_string(),
            }),
            _ => None,
        }
    }
}

/// Executes commands against the registration and user stores.
#[derive(Clone)]
pub struct CommandHandler {
    users: UserStore,
    registrations: RegistrationStore,
    admin_ids: Vec<u64>,
}

impl CommandHandler {
    pub fn new(users: UserStore, registrations: RegistrationStore, admin_ids: Vec<u64>) -> Self {
        Self {
            users,
            registrations,
            admin_ids,
        }
    }

    /// Run `command` for the given author and return the reply text.
    pub fn execute(
        &self,
        author_id: u64,
        author_name: &str,
        command: Command,
    ) -> anyhow::Result<String> {
        debug!("Processing command {:?} from {}", command, author_name);

        match command {
            Command::Register { character } => {
                if character.is_empty() {
                    return Ok("Usage: `!register <character>`".to_string());
                }
                let registration =
                    self.registrations
                        .add(&author_id.to_string(), author_name, &character)?;
                info!(
                    "Registration {} queued: {} as {}",
                    registration.code, author_name, character
                );
                Ok(format!(
                    "Registration for {} queued with code {}. An admin must approve it.",
                    character, registration.code
                ))
            }
            Command::Approve { code } => self.resolve(author_id, &code, RegistrationStatus::Approved),
            Command::Deny { code } => self.resolve(author_id, &code, RegistrationStatus::Denied),
        }
    }

    fn resolve(
        &self,
        author_id: u64,
        code: &str,
        status: RegistrationStatus,
    ) -> anyhow::Result<String> {
        if !self.admin_ids.contains(&author_id) {
            return Ok("You are not allowed to resolve registrations.".to_string());
        }
        if code.is_empty() {
            return Ok("Usage: `!approve <code>` or `!deny <code>`".to_string());
        }

        let Some(mut registration) = self.registrations.find_by_code(code) else {
            return Ok(format!("No registration with code {}.", code));
        };
        if registration.status != RegistrationStatus::Pending {
            return Ok(format!("Registration {} was already resolved.", code));
        }

        registration.status = status;
        self.registrations.update(registration.clone())?;

        if status == RegistrationStatus::Approved {
            self.users
                .set(&registration.discord_id, &registration.character)?;
            info!(
                "Approved {} as {}",
                registration.discord_name, registration.character
            );
            Ok(format!(
                "Approved: {} now speaks as {}.",
                registration.discord_name, registration.character
            ))
        } else {
            info!("Denied registration {}", code);
            Ok(format!(
                "Denied registration of {} for {}.",
                registration.character, registration.discord_name
            ))
        }
    }
}
