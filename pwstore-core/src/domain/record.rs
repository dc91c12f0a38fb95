//! Record domain model

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Field separator used when encoding
const FIELD_SEPARATOR: char = '\t';

fn tab_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\t+").unwrap())
}

fn space_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r" +").unwrap())
}

/// A single stored credential
///
/// Records have no identity beyond their field values: the same account may
/// appear several times with different usernames.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub account: String,
    pub username: String,
    pub password: String,
}

impl Record {
    pub fn new(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Decode one line of the plaintext database
    ///
    /// A line containing any tab is tab-delimited, otherwise it is treated
    /// as the legacy space-delimited form. A line of exactly three
    /// tab-separated fields is taken as written, which keeps an empty
    /// username (`acct<TAB><TAB>pw`) intact. Anything else has runs of the
    /// separator collapsed into one. Fields past the third are ignored and
    /// the account must not be empty.
    ///
    /// `line_number` is only used for error reporting.
    pub fn decode(line: &str, line_number: usize) -> Result<Self> {
        let fields: Vec<&str> = if line.contains(FIELD_SEPARATOR) {
            let exact: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
            if exact.len() == 3 {
                exact
            } else {
                tab_runs().split(line).collect()
            }
        } else {
            space_runs().split(line).collect()
        };

        match fields.as_slice() {
            [account, username, password, ..] if !account.is_empty() => {
                Ok(Self::new(*account, *username, *password))
            }
            _ => Err(Error::MalformedRecord { line: line_number }),
        }
    }

    /// Encode as `account<TAB>username<TAB>password`
    pub fn encode(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.account,
            self.username,
            self.password,
            sep = FIELD_SEPARATOR
        )
    }

    /// Case-insensitive substring match on account and, optionally, username
    ///
    /// An empty username query is the same as no query.
    pub fn matches(&self, account: &str, username: Option<&str>) -> bool {
        if !contains_ignore_case(&self.account, account) {
            return false;
        }
        match username {
            Some(u) if !u.is_empty() => contains_ignore_case(&self.username, u),
            _ => true,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<15} {:<25} {}", self.account, self.username, self.password)
    }
}

// Passwords stay out of debug output and panic messages.
impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("account", &self.account)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
