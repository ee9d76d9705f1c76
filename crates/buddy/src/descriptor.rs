//! Policy descriptors: the ordered strategy tokens configured for a module.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

/// Strategy named by a recognized descriptor token.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display, strum::IntoStaticStr,
)]
pub enum PolicyKind {
	/// Search modules that depend on the policed module, growing the search
	/// one hop at a time.
	#[strum(to_string = "dependent")]
	Dependent,
	/// Search direct dependents that opted in to serving the policed module.
	#[strum(to_string = "registered")]
	Registered,
	/// Search every provider of the symbol's namespace.
	#[strum(to_string = "global")]
	Global,
	#[strum(to_string = "boot")]
	Boot,
	#[strum(to_string = "platform", serialize = "ext")]
	Platform,
	#[strum(to_string = "application", serialize = "app")]
	Application,
	/// The parent delegate captured when the handler was built.
	#[strum(to_string = "parent")]
	Parent,
}

impl PolicyKind {
	/// Parses a single trimmed token. Matching is case-sensitive.
	pub fn from_token(token: &str) -> Option<Self> {
		Self::from_str(token.trim()).ok()
	}
}

/// Ordered strategy tokens for one module.
///
/// Order is priority: the first strategy to produce a result wins single-value
/// lookups. Tokens are kept raw; unknown tokens are only detected when the
/// orchestrator first materializes their slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDescriptor {
	tokens: Arc<[Arc<str>]>,
}

impl PolicyDescriptor {
	/// Builds a descriptor from tokens, trimming them and skipping empty ones.
	pub fn new<I, S>(tokens: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		Self {
			tokens: tokens
				.into_iter()
				.map(|t| t.as_ref().trim().to_owned())
				.filter(|t| !t.is_empty())
				.map(Arc::from)
				.collect(),
		}
	}

	/// Parses a header-style value such as `"registered, global"`.
	pub fn parse(header: &str) -> Self {
		Self::new(header.split(','))
	}

	pub fn tokens(&self) -> &[Arc<str>] {
		&self.tokens
	}

	pub(crate) fn shared_tokens(&self) -> Arc<[Arc<str>]> {
		self.tokens.clone()
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	/// Tokens that do not name a known strategy.
	pub fn unknown_tokens(&self) -> impl Iterator<Item = &str> {
		self.tokens
			.iter()
			.map(|t| &**t)
			.filter(|t| PolicyKind::from_token(t).is_none())
	}
}

impl fmt::Display for PolicyDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.tokens.join(", "))
	}
}

impl<'de> Deserialize<'de> for PolicyDescriptor {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Header(String),
			List(Vec<String>),
		}

		Ok(match Raw::deserialize(deserializer)? {
			Raw::Header(header) => Self::parse(&header),
			Raw::List(tokens) => Self::new(tokens),
		})
	}
}
