use std::collections::HashSet;

use alloy::primitives::{Address, B256};
use alloy::primitives::utils::format_ether;
use alloy::signers::local::PrivateKeySigner;
use anyhow::Result;
use tracing::debug;

use parley_chain::ChainGateway;
use parley_session::{Session, SessionStore};
use parley_types::{ChainError, ChatEntry, Config};

/// One REPL line, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Session,
    Address,
    Key,
    Balance,
    Connect,
    Register,
    Send { to: String, text: String },
    History { json: bool },
    Rpc { url: String },
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    match verb.to_lowercase().as_str() {
        "help" => Command::Help,
        "session" => Command::Session,
        "address" => Command::Address,
        "key" => Command::Key,
        "balance" => Command::Balance,
        "connect" => Command::Connect,
        "register" => Command::Register,
        "send" => match rest.split_once(char::is_whitespace) {
            Some((to, text)) if !text.trim().is_empty() => Command::Send {
                to: to.to_string(),
                text: text.trim().to_string(),
            },
            _ => Command::Unknown("usage: send <address> <message>".into()),
        },
        "history" => Command::History {
            json: rest == "--json",
        },
        "rpc" => {
            if rest.is_empty() {
                Command::Unknown("usage: rpc <url>".into())
            } else {
                Command::Rpc {
                    url: rest.to_string(),
                }
            }
        }
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(format!("unknown command `{other}`; try `help`")),
    }
}

pub struct App {
    config: Config,
    store: SessionStore,
    gateway: ChainGateway,
    session: Option<Session>,
    primary: Option<PrivateKeySigner>,
    primary_address: Option<Address>,
    history: Vec<ChatEntry>,
    /// Transaction hashes already printed, so re-fetched history only
    /// renders what is new.
    seen: HashSet<B256>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let store = SessionStore::new(&config.session_key_path);
        let gateway = ChainGateway::connect(config.clone())?;
        Ok(Self {
            config,
            store,
            gateway,
            session: None,
            primary: None,
            primary_address: None,
            history: Vec::new(),
            seen: HashSet::new(),
        })
    }

    pub fn restore_session(&mut self) {
        match self.store.restore() {
            Ok(Some(session)) => {
                println!("session restored: {}", session.address());
                self.session = Some(session);
            }
            Ok(None) => println!(
                "no session in {}; run `session` to create one",
                self.store.path().display()
            ),
            Err(e) => println!("could not restore session: {e:#}"),
        }
    }

    /// Run one command. Returns `false` when the REPL should exit.
    pub async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Help => self.help(),
            Command::Session => self.create_session(),
            Command::Address => match &self.session {
                Some(session) => println!("{}", session.address()),
                None => println!("{}", ChainError::NoSession),
            },
            Command::Key => match &self.session {
                Some(session) => {
                    println!("private key (do not share):");
                    println!("{}", session.reveal_private_key());
                }
                None => println!("{}", ChainError::NoSession),
            },
            Command::Balance => self.balance().await,
            Command::Connect => self.connect_primary().await,
            Command::Register => self.register().await,
            Command::Send { to, text } => self.send(&to, &text).await,
            Command::History { json } => self.show_history(json),
            Command::Rpc { url } => self.set_rpc(&url),
            Command::Quit => return false,
            Command::Empty => {}
            Command::Unknown(msg) => println!("{msg}"),
        }
        true
    }

    fn help(&self) {
        println!("session            create a new burner session (overwrites the old one)");
        println!("address            print the session address");
        println!("key                reveal the session private key");
        println!("balance            refresh and print the session balance");
        println!("connect            connect the primary identity (PARLEY_PRIMARY_KEY)");
        println!("register           bind and fund the session on-chain");
        println!("send <addr> <msg>  encrypt and send a message");
        println!("history [--json]   print the current chat history");
        println!("rpc <url>          switch the read/send endpoint");
        println!("quit               exit");
    }

    fn create_session(&mut self) {
        match self.store.create() {
            Ok(session) => {
                println!("session created: {}", session.address());
                println!("run `register` to bind and fund it from your primary identity");
                self.session = Some(session);
                self.history.clear();
                self.seen.clear();
            }
            Err(e) => println!("session creation failed: {e:#}"),
        }
    }

    async fn balance(&mut self) {
        let Some(session) = self.session.as_mut() else {
            println!("{}", ChainError::NoSession);
            return;
        };
        session.update_balance(self.gateway.provider()).await;
        println!(
            "{} on {}",
            format_ether(session.balance()),
            session.address()
        );
    }

    async fn connect_primary(&mut self) {
        let raw = match std::env::var("PARLEY_PRIMARY_KEY") {
            Ok(raw) => raw,
            Err(_) => {
                println!("no primary identity available; set PARLEY_PRIMARY_KEY to your wallet key");
                return;
            }
        };
        let signer: PrivateKeySigner = match raw.trim().parse() {
            Ok(signer) => signer,
            Err(e) => {
                println!("PARLEY_PRIMARY_KEY is not a valid private key: {e}");
                return;
            }
        };
        match self.gateway.connect_primary(&signer).await {
            Ok(address) => {
                println!("primary identity: {address}");
                self.primary = Some(signer);
                self.primary_address = Some(address);
            }
            Err(e @ ChainError::WrongNetwork { .. }) => {
                println!("{e}");
                println!(
                    "point `rpc <url>` at a chain-{} endpoint and connect again",
                    self.config.chain_id
                );
            }
            Err(e) => println!("connect failed: {e}"),
        }
    }

    async fn register(&mut self) {
        let Some(session) = self.session.as_ref() else {
            println!("{}", ChainError::NoSession);
            return;
        };
        let Some(primary) = self.primary.as_ref() else {
            println!("{}", ChainError::NoPrimary);
            return;
        };
        println!("registering session on-chain...");
        match self.gateway.register_session(primary, session).await {
            Ok(tx) => {
                println!("registered in {tx}; session pre-funded");
                if let Some(session) = self.session.as_mut() {
                    session.update_balance(self.gateway.provider()).await;
                }
            }
            Err(ChainError::Cancelled) => println!("registration cancelled"),
            Err(e) => println!("registration failed: {e}"),
        }
    }

    async fn send(&mut self, to: &str, text: &str) {
        let Some(session) = self.session.as_ref() else {
            println!("{}", ChainError::NoSession);
            return;
        };
        let to: Address = match to.parse() {
            Ok(addr) => addr,
            Err(_) => {
                println!("recipient is not a valid address");
                return;
            }
        };
        match self.gateway.send_message(session, to, text).await {
            Ok(tx) => {
                println!("sent in {tx}");
                self.poll().await;
            }
            Err(e @ ChainError::NotRegistered(_)) => {
                println!("warning: {e}");
                println!("they need to run `register` against this contract before you can message them");
            }
            Err(e @ ChainError::InsufficientFunds { .. }) => println!("{e}"),
            Err(ChainError::Cancelled) => println!("send cancelled"),
            Err(e) => println!("send failed: {e}"),
        }
    }

    fn show_history(&self, json: bool) {
        if json {
            match serde_json::to_string_pretty(&self.history) {
                Ok(out) => println!("{out}"),
                Err(e) => println!("history export failed: {e}"),
            }
            return;
        }
        if self.history.is_empty() {
            println!("no messages in the current window");
            return;
        }
        for entry in &self.history {
            self.render_entry(entry);
        }
    }

    fn set_rpc(&mut self, url: &str) {
        let mut config = self.config.clone();
        config.rpc_url = url.trim().to_string();
        match ChainGateway::connect(config.clone()) {
            Ok(gateway) => {
                self.config = config;
                self.gateway = gateway;
                // The chain-id gate ran against the old endpoint.
                self.primary = None;
                self.primary_address = None;
                println!("endpoint set to {}", self.config.rpc_url);
                println!("run `connect` to re-verify the network");
            }
            Err(e) => println!("bad endpoint: {e}"),
        }
    }

    /// One poll cycle: refresh the balance, rebuild the history from the
    /// event log, print what has not been seen yet. Requires both a
    /// session and a connected primary; read failures are logged only.
    pub async fn poll(&mut self) {
        let Some(me) = self.primary_address else {
            return;
        };
        if let Some(session) = self.session.as_mut() {
            session.update_balance(self.gateway.provider()).await;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        match self.gateway.fetch_messages(me, session.secret()).await {
            Ok(history) => {
                for entry in &history {
                    if self.seen.insert(entry.id) {
                        self.render_entry(entry);
                    }
                }
                self.history = history;
            }
            Err(e) => debug!("poll failed: {e}"),
        }
    }

    fn render_entry(&self, entry: &ChatEntry) {
        let who = if Some(entry.from) == self.primary_address {
            "you".to_string()
        } else {
            short_addr(&entry.from)
        };
        println!(
            "[{}] {}: {}",
            entry.sent_at().format("%H:%M:%S"),
            who,
            entry.text
        );
    }
}

fn short_addr(addr: &Address) -> String {
    let full = addr.to_string();
    format!("{}..", &full[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_keeps_the_whole_message() {
        let cmd = parse_command("send 0xabc hello there, world");
        assert_eq!(
            cmd,
            Command::Send {
                to: "0xabc".into(),
                text: "hello there, world".into()
            }
        );
    }

    #[test]
    fn send_without_text_is_rejected() {
        assert!(matches!(parse_command("send 0xabc"), Command::Unknown(_)));
        assert!(matches!(parse_command("send 0xabc   "), Command::Unknown(_)));
    }

    #[test]
    fn history_flag_parses() {
        assert_eq!(parse_command("history"), Command::History { json: false });
        assert_eq!(
            parse_command("history --json"),
            Command::History { json: true }
        );
    }

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(parse_command("CONNECT"), Command::Connect);
        assert_eq!(parse_command("  Quit "), Command::Quit);
    }

    #[test]
    fn blank_and_noise_lines() {
        assert_eq!(parse_command("   "), Command::Empty);
        assert!(matches!(parse_command("frobnicate"), Command::Unknown(_)));
    }

    #[test]
    fn short_addr_keeps_the_prefix() {
        let addr = Address::repeat_byte(0xab);
        let short = short_addr(&addr);
        assert!(short.to_lowercase().starts_with("0xababab"));
        assert!(short.ends_with(".."));
    }
}
