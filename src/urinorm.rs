//! URI normalization used wherever URLs are compared.
//!
//! [`normalize`] lower-cases the scheme and host, drops default ports, removes dot segments,
//! turns an empty path into `/`, decodes percent-escapes of unreserved characters, and
//! upper-cases the hex digits of every other escape. The output is a fixed point: normalizing it
//! again yields the same string.

// self
use crate::{_prelude::*, error::MalformedUri};

const VALID_SCHEMES: [&str; 2] = ["http", "https"];

/// A normalized http/https URI split into its components.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedUri {
	/// Lower-cased scheme (`http` or `https`).
	pub scheme: String,
	/// Raw userinfo, when present.
	pub userinfo: Option<String>,
	/// Lower-cased host; never empty.
	pub host: String,
	/// Explicit non-default port.
	pub port: Option<u16>,
	/// Path after dot-segment removal; never empty.
	pub path: String,
	/// Query without the leading `?`; `Some("")` keeps a bare `?`.
	pub query: Option<String>,
	/// Fragment without the leading `#`.
	pub fragment: Option<String>,
}
impl NormalizedUri {
	/// Port in effect, falling back to the scheme default.
	pub fn effective_port(&self) -> u16 {
		self.port.unwrap_or_else(|| default_port(&self.scheme))
	}
}
impl Display for NormalizedUri {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}://", self.scheme)?;

		if let Some(userinfo) = &self.userinfo {
			write!(f, "{userinfo}@")?;
		}

		f.write_str(&self.host)?;

		if let Some(port) = self.port {
			write!(f, ":{port}")?;
		}

		f.write_str(&self.path)?;

		if let Some(query) = &self.query {
			write!(f, "?{query}")?;
		}
		if let Some(fragment) = &self.fragment {
			write!(f, "#{fragment}")?;
		}

		Ok(())
	}
}

/// Normalizes `uri` into its canonical string form.
pub fn normalize(uri: &str) -> Result<String, MalformedUri> {
	normalize_parts(uri).map(|parts| parts.to_string())
}

/// Normalizes `uri` and returns its components.
pub fn normalize_parts(uri: &str) -> Result<NormalizedUri, MalformedUri> {
	if !uri.chars().all(|c| c.is_ascii_graphic()) {
		return Err(MalformedUri::new(uri, "contains characters not allowed in a URI"));
	}

	let (scheme, rest) = uri.split_once(':').ok_or_else(|| MalformedUri::new(uri, "no scheme"))?;

	if !is_scheme(scheme) {
		return Err(MalformedUri::new(uri, "no scheme"));
	}

	let scheme = scheme.to_ascii_lowercase();

	if !VALID_SCHEMES.contains(&scheme.as_str()) {
		return Err(MalformedUri::new(uri, "not an HTTP or HTTPS URI"));
	}

	let rest = rest.strip_prefix("//").ok_or_else(|| MalformedUri::new(uri, "no host"))?;
	let rest = normalize_escapes(rest).ok_or_else(|| MalformedUri::new(uri, "invalid percent-escape"))?;
	let (rest, fragment) = match rest.split_once('#') {
		Some((head, fragment)) => (head, Some(fragment.to_owned())),
		None => (rest.as_str(), None),
	};
	let (rest, query) = match rest.split_once('?') {
		Some((head, query)) => (head, Some(query.to_owned())),
		None => (rest, None),
	};
	let (authority, path) = match rest.find('/') {
		Some(idx) => rest.split_at(idx),
		None => (rest, ""),
	};
	let (userinfo, host_port) = match authority.rsplit_once('@') {
		Some((userinfo, host_port)) => (Some(userinfo.to_owned()), host_port),
		None => (None, authority),
	};
	let (host, port) = split_host_port(host_port).ok_or_else(|| MalformedUri::new(uri, "invalid port"))?;

	if host.is_empty() {
		return Err(MalformedUri::new(uri, "no host"));
	}

	let port = port.filter(|port| *port != default_port(&scheme));
	let mut path = remove_dot_segments(path);

	if path.is_empty() {
		path.push('/');
	}

	Ok(NormalizedUri {
		scheme,
		userinfo,
		host: host.to_ascii_lowercase(),
		port,
		path,
		query,
		fragment,
	})
}

/// Removes `.` and `..` segments from a path (RFC 3986 section 5.2.4).
pub fn remove_dot_segments(path: &str) -> String {
	let mut input = path;
	let mut output: Vec<&str> = Vec::new();

	while !input.is_empty() {
		if let Some(rest) = input.strip_prefix("../") {
			input = rest;
		} else if let Some(rest) = input.strip_prefix("./") {
			input = rest;
		} else if input.starts_with("/./") {
			input = &input[2..];
		} else if input == "/." {
			input = "/";
		} else if input.starts_with("/../") {
			input = &input[3..];
			output.pop();
		} else if input == "/.." {
			input = "/";
			output.pop();
		} else if input == "." || input == ".." {
			input = "";
		} else {
			let from = usize::from(input.starts_with('/'));
			let end = input[from..].find('/').map_or(input.len(), |idx| idx + from);

			output.push(&input[..end]);
			input = &input[end..];
		}
	}

	output.concat()
}

fn is_scheme(scheme: &str) -> bool {
	let mut chars = scheme.chars();

	chars.next().is_some_and(|c| c.is_ascii_alphabetic())
		&& chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn default_port(scheme: &str) -> u16 {
	if scheme == "https" { 443 } else { 80 }
}

fn split_host_port(host_port: &str) -> Option<(&str, Option<u16>)> {
	let port_sep = if host_port.starts_with('[') {
		let close = host_port.find(']')?;

		host_port[close..].find(':').map(|idx| idx + close)
	} else {
		host_port.rfind(':')
	};

	match port_sep {
		Some(idx) => {
			let digits = &host_port[idx + 1..];
			let port = if digits.is_empty() { None } else { Some(digits.parse().ok()?) };

			Some((&host_port[..idx], port))
		},
		None => Some((host_port, None)),
	}
}

fn is_unreserved(byte: u8) -> bool {
	byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'~' | b'-')
}

// Decodes escapes of unreserved characters and upper-cases the rest; `None` on a broken escape.
fn normalize_escapes(input: &str) -> Option<String> {
	let bytes = input.as_bytes();
	let mut out = String::with_capacity(input.len());
	let mut idx = 0;

	while idx < bytes.len() {
		if bytes[idx] != b'%' {
			out.push(char::from(bytes[idx]));
			idx += 1;

			continue;
		}

		let hex = input.get(idx + 1..idx + 3)?;
		let decoded = u8::from_str_radix(hex, 16).ok()?;

		if is_unreserved(decoded) {
			out.push(char::from(decoded));
		} else {
			out.push('%');
			out.push_str(&hex.to_ascii_uppercase());
		}

		idx += 3;
	}

	Some(out)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn dot_segments_follow_rfc_examples() {
		assert_eq!(remove_dot_segments("/a/b/../c"), "/a/c");
		assert_eq!(remove_dot_segments("/.."), "/");
		assert_eq!(remove_dot_segments(""), "");
		assert_eq!(remove_dot_segments("/a/b/c/./../../g"), "/a/g");
		assert_eq!(remove_dot_segments("mid/content=5/../6"), "mid/6");
		assert_eq!(remove_dot_segments("/foo/."), "/foo/");
		assert_eq!(remove_dot_segments("../bar"), "bar");
	}

	#[test]
	fn normalize_canonicalizes_case_path_and_escapes() {
		assert_eq!(
			normalize("HTTP://Example.COM/a/./b/../c").expect("URI should normalize."),
			"http://example.com/a/c"
		);
		assert_eq!(normalize("http://example.com").expect("URI should normalize."), "http://example.com/");
		assert_eq!(
			normalize("http://example.com/%7ejoe/%2f?q=%3a").expect("URI should normalize."),
			"http://example.com/~joe/%2F?q=%3A"
		);
		assert_eq!(
			normalize("https://example.com:443/x").expect("URI should normalize."),
			"https://example.com/x"
		);
		assert_eq!(
			normalize("http://example.com:8000/x#frag").expect("URI should normalize."),
			"http://example.com:8000/x#frag"
		);
	}

	#[test]
	fn normalize_is_idempotent() {
		for uri in [
			"HTTP://Example.COM/a/./b/../c?x=%2f#F",
			"http://user@example.com:8080/%7e/%41%2E%2e/",
			"https://example.com/%2e%2E/x",
			"http://example.com?",
		] {
			let once = normalize(uri).expect("Fixture URI should normalize.");
			let twice = normalize(&once).expect("Normalized URI should normalize again.");

			assert_eq!(once, twice, "normalize must be idempotent for {uri}");
		}
	}

	#[test]
	fn normalize_rejects_unusable_uris() {
		assert_eq!(normalize("example.com/path").expect_err("No scheme.").reason, "no scheme");
		assert_eq!(
			normalize("ftp://example.com/").expect_err("Wrong scheme.").reason,
			"not an HTTP or HTTPS URI"
		);
		assert_eq!(normalize("http:///path").expect_err("Empty host.").reason, "no host");
		assert_eq!(normalize("http:example.com").expect_err("No authority.").reason, "no host");
		assert!(normalize("http://example.com/%zz").is_err());
		assert!(normalize("http://example.com/a b").is_err());
		assert!(normalize("http://example.com:port/").is_err());
	}

	#[test]
	fn parts_expose_effective_port() {
		let parts = normalize_parts("https://Example.com:8443/p?q").expect("URI should normalize.");

		assert_eq!(parts.host, "example.com");
		assert_eq!(parts.effective_port(), 8443);
		assert_eq!(parts.query.as_deref(), Some("q"));

		let parts = normalize_parts("http://example.com").expect("URI should normalize.");

		assert_eq!(parts.port, None);
		assert_eq!(parts.effective_port(), 80);
	}
}
