//! Resolution and relativization of URI references.
//!
//! Only the subset of RFC 3986 the protocol needs is implemented. The two
//! directions are kept consistent: for any same-origin absolute `target`,
//! `resolve(base, &relate(base, target)) == target`.

/// Byte length of the leading `scheme:` of `text`, colon included.
fn scheme_len(text: &str) -> Option<usize> {
	let mut chars = text.char_indices();
	match chars.next() {
		Some((_, c)) if c.is_ascii_alphabetic() => {}
		_ => return None,
	}
	for (i, c) in chars {
		match c {
			':' => return Some(i + 1),
			c if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+') => {}
			_ => return None,
		}
	}
	None
}

/// Byte offset at which the path of `uri` begins.
fn path_start(uri: &str) -> usize {
	let Some(scheme) = scheme_len(uri) else {
		return 0;
	};
	if !uri[scheme..].starts_with("//") {
		return scheme;
	}
	let authority = scheme + 2;
	uri[authority..]
		.find(|c| matches!(c, '/' | '?' | '#'))
		.map_or(uri.len(), |i| authority + i)
}

fn ends_segment(rest: &str) -> bool {
	rest.is_empty() || rest.starts_with('#') || rest.starts_with('?')
}

/// Drops the last segment of a directory path such as `a/b/`.
fn pop_segment(path: &str) -> &str {
	let trimmed = path.strip_suffix('/').unwrap_or(path);
	match trimmed.rfind('/') {
		Some(i) => &path[..=i],
		None => "",
	}
}

/// Returns `true` when `text` starts with a URI scheme.
pub fn is_absolute(text: &str) -> bool {
	scheme_len(text).is_some()
}

/// Returns `uri` without its fragment.
pub fn strip_fragment(uri: &str) -> &str {
	match uri.find('#') {
		Some(i) => &uri[..i],
		None => uri,
	}
}

fn strip_query(uri: &str) -> &str {
	match uri.find('?') {
		Some(i) => &uri[..i],
		None => uri,
	}
}

/// Returns the text after `#`, if any.
pub fn fragment(uri: &str) -> Option<&str> {
	uri.find('#').map(|i| &uri[i + 1..])
}

/// Returns the text between `?` and `#`, if any.
pub fn query(uri: &str) -> Option<&str> {
	let head = strip_fragment(uri);
	head.find('?').map(|i| &head[i + 1..])
}

/// Returns the `scheme://authority` prefix of `uri`.
///
/// URIs without an authority component have no origin.
pub fn origin(uri: &str) -> Option<&str> {
	let scheme = scheme_len(uri)?;
	if !uri[scheme..].starts_with("//") {
		return None;
	}
	Some(&uri[..path_start(uri)])
}

/// Returns `true` when `uri` designates a promise whose value is not yet known.
///
/// Promise URIs carry an `o=` parameter in their fragment.
pub fn is_promise(uri: &str) -> bool {
	fragment(uri).is_some_and(|f| f.split('&').any(|param| param.starts_with("o=")))
}

/// Resolves `href` against the absolute URI `base`.
///
/// The fragment of `base` never leaks into the result.
pub fn resolve(base: &str, href: &str) -> String {
	let base = strip_fragment(base);
	if href.is_empty() {
		return base.to_string();
	}
	if href.starts_with('#') {
		return format!("{base}{href}");
	}
	if is_absolute(href) {
		return href.to_string();
	}
	if href.starts_with("//") {
		let scheme = scheme_len(base).map_or("", |n| &base[..n]);
		return format!("{scheme}{href}");
	}
	let start = path_start(base);
	if href.starts_with('/') {
		return format!("{}{href}", &base[..start]);
	}
	let base = strip_query(base);
	if href.starts_with('?') {
		return format!("{base}{href}");
	}

	let host = &base[..start];
	let path = &base[start..];
	let dir = match path.rfind('/') {
		Some(i) => &path[..=i],
		None if path.is_empty() => "/",
		None => "",
	};
	let (root, mut path) = match dir.strip_prefix('/') {
		Some(rest) => ("/", rest),
		None => ("", dir),
	};

	let mut href = href;
	loop {
		if let Some(rest) = href.strip_prefix("../") {
			path = pop_segment(path);
			href = rest;
		} else if let Some(rest) = href.strip_prefix("./") {
			href = rest;
		} else {
			break;
		}
	}
	if let Some(rest) = href.strip_prefix("..") {
		if ends_segment(rest) {
			path = pop_segment(path);
			href = rest;
		}
	}
	if let Some(rest) = href.strip_prefix('.') {
		if ends_segment(rest) {
			href = rest;
		}
	}
	format!("{host}{root}{path}{href}")
}

/// Expresses `target` relative to `base` when both share an origin.
///
/// Returns `target` unchanged when the origins differ or when no relative
/// form would resolve back to exactly `target`.
pub fn relate(base: &str, target: &str) -> String {
	let base = strip_fragment(base);
	let (Some(base_origin), Some(target_origin)) = (origin(base), origin(target)) else {
		return target.to_string();
	};
	if base_origin != target_origin {
		return target.to_string();
	}

	let base_path = strip_query(&base[base_origin.len()..]);
	let base_dir = match base_path.rfind('/') {
		Some(i) => &base_path[1..=i],
		None => "",
	};

	let rest = &target[target_origin.len()..];
	let end = rest.find(|c| c == '?' || c == '#').unwrap_or(rest.len());
	let (target_path, tail) = rest.split_at(end);
	let Some(target_path) = target_path.strip_prefix('/') else {
		return target.to_string();
	};

	let mut common = 0;
	let mut ups = 0;
	let mut matching = true;
	for segment in base_dir.split_inclusive('/') {
		if matching && target_path[common..].starts_with(segment) {
			common += segment.len();
		} else {
			matching = false;
			ups += 1;
		}
	}

	let suffix = &target_path[common..];
	let first = suffix.split('/').next().unwrap_or("");
	if first == "." || first == ".." {
		return target.to_string();
	}

	let prefix = if ups == 0 { "./".to_string() } else { "../".repeat(ups) };
	format!("{prefix}{suffix}{tail}")
}
