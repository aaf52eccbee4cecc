//! XRI classification, normalization, and authority relationships.

/// Authority sigils that mark an identifier as an XRI; `(` opens a cross-reference.
pub const XRI_AUTHORITIES: [char; 6] = ['!', '=', '@', '+', '$', '('];

const XRI_PREFIX: &str = "xri://";

/// Kind of user-supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentifierScheme {
	/// `xri://` prefixed or sigil-led identifier.
	Xri,
	/// Anything else, treated as a URL.
	Uri,
}

/// Classifies `identifier` as an XRI or a URI.
pub fn identifier_scheme(identifier: &str) -> IdentifierScheme {
	if identifier.starts_with(XRI_PREFIX)
		|| identifier.chars().next().is_some_and(|c| XRI_AUTHORITIES.contains(&c))
	{
		IdentifierScheme::Xri
	} else {
		IdentifierScheme::Uri
	}
}

/// Converts an XRI to IRI-normal form. Not idempotent; apply once.
pub fn to_iri_normal(xri: &str) -> String {
	escape_for_iri(&make_xri(xri))
}

/// Escapes `%` everywhere and `/ ? #` inside parenthesized cross-references.
pub fn escape_for_iri(xri: &str) -> String {
	let mut out = String::with_capacity(xri.len());
	let mut depth = 0_usize;

	for c in xri.chars() {
		match c {
			'%' => out.push_str("%25"),
			'(' => {
				depth += 1;
				out.push(c);
			},
			')' => {
				depth = depth.saturating_sub(1);
				out.push(c);
			},
			'/' if depth > 0 => out.push_str("%2F"),
			'?' if depth > 0 => out.push_str("%3F"),
			'#' if depth > 0 => out.push_str("%23"),
			c => out.push(c),
		}
	}

	out
}

/// Converts an XRI to URI-normal form. Not idempotent; apply once.
pub fn to_uri_normal(xri: &str) -> String {
	iri_to_uri(&to_iri_normal(xri))
}

/// Percent-encodes every non-ASCII character as its UTF-8 octets.
pub fn iri_to_uri(iri: &str) -> String {
	let mut out = String::with_capacity(iri.len());

	for c in iri.chars() {
		if c.is_ascii() {
			out.push(c);
		} else {
			let mut buf = [0; 4];

			for byte in c.encode_utf8(&mut buf).bytes() {
				out.push_str(&format!("%{byte:02X}"));
			}
		}
	}

	out
}

/// True iff `canonical_id` minus its last `!` segment equals `provider_id`.
pub fn provider_is_authoritative(provider_id: &str, canonical_id: &str) -> bool {
	canonical_id.rsplit_once('!').is_some_and(|(parent, _)| parent == provider_id)
}

/// Returns the root authority of `xri` in `xri://` form.
pub fn root_authority(xri: &str) -> String {
	let xri = xri.strip_prefix(XRI_PREFIX).unwrap_or(xri);
	let authority = xri.split('/').next().unwrap_or_default();
	let root = match authority.chars().next() {
		Some('(') => match closing_paren(authority) {
			Some(end) => &authority[..=end],
			None => authority,
		},
		Some(c) if XRI_AUTHORITIES.contains(&c) => &authority[..c.len_utf8()],
		_ => authority.split(['!', '*']).next().unwrap_or_default(),
	};

	make_xri(root)
}

/// Prefixes `xri://` unless already present.
pub fn make_xri(xri: &str) -> String {
	if xri.starts_with(XRI_PREFIX) { xri.to_owned() } else { format!("{XRI_PREFIX}{xri}") }
}

/// Appends form-urlencoded `args` to `url`, dropping trailing `?` first.
pub fn append_args(url: &str, args: &[(&str, &str)]) -> String {
	if args.is_empty() {
		return url.to_owned();
	}

	let base = url.trim_end_matches('?');
	let sep = if base.contains('?') { '&' } else { '?' };
	let query = args
		.iter()
		.map(|(key, value)| format!("{}={}", form_encode(key), form_encode(value)))
		.collect::<Vec<_>>()
		.join("&");

	format!("{base}{sep}{query}")
}

fn form_encode(value: &str) -> String {
	url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn closing_paren(authority: &str) -> Option<usize> {
	let mut depth = 0_usize;

	for (idx, c) in authority.char_indices() {
		match c {
			'(' => depth += 1,
			')' => {
				depth = depth.saturating_sub(1);

				if depth == 0 {
					return Some(idx);
				}
			},
			_ => {},
		}
	}

	None
}
