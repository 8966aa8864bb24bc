use std::collections::HashMap;
use std::fmt;

/// One compiled segment of a path specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Case-sensitive literal segment, e.g. `pets` in `/pets/:id`.
    Literal(String),
    /// Named parameter segment, e.g. `:id`. Matches any single segment.
    Param(String),
    /// Trailing `*`, matching the (possibly empty) remainder of the path.
    Wildcard,
}

/// Registration-time path specification error.
///
/// Returned by [`RoutePattern::compile`] when a path spec is malformed.
/// These surface synchronously to the registering caller and are never
/// produced at request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The spec contains an empty segment, e.g. `/a//b`.
    EmptySegment {
        /// The offending path spec
        spec: String,
    },
    /// The same parameter name appears twice in one spec.
    DuplicateParam {
        /// The offending path spec
        spec: String,
        /// The repeated parameter name
        name: String,
    },
    /// A parameter name contains characters outside `[A-Za-z0-9_-]`.
    InvalidParamName {
        /// The offending path spec
        spec: String,
        /// The rejected parameter name
        name: String,
    },
    /// A `*` segment appears somewhere other than the final position.
    InteriorWildcard {
        /// The offending path spec
        spec: String,
    },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::EmptySegment { spec } => {
                write!(f, "path spec '{spec}' contains an empty segment")
            }
            PatternError::DuplicateParam { spec, name } => {
                write!(f, "path spec '{spec}' binds parameter ':{name}' more than once")
            }
            PatternError::InvalidParamName { spec, name } => {
                write!(
                    f,
                    "path spec '{spec}' has invalid parameter name ':{name}' \
                     (allowed characters: A-Z a-z 0-9 _ -)"
                )
            }
            PatternError::InteriorWildcard { spec } => {
                write!(f, "path spec '{spec}' has a wildcard that is not the final segment")
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// Bindings produced by aligning one pattern against one request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathBindings {
    /// Named parameter values, percent-decoded.
    pub params: HashMap<String, String>,
    /// Remainder captured by a trailing `*`, `None` if the pattern has none.
    pub wildcard: Option<String>,
}

/// A compiled, immutable path specification.
///
/// Compiled once at registration time. Splitting is on `/`; leading and
/// trailing slashes are normalized away, so `/pets`, `pets` and `/pets/`
/// compile to the same pattern. A segment beginning with `:` is a named
/// parameter, a segment equal to `*` is a trailing wildcard, anything else
/// is a case-sensitive literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

fn valid_param_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl RoutePattern {
    /// Compile a path spec into a matchable pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if the spec contains an empty segment, a
    /// duplicate or invalid parameter name, or a wildcard that is not the
    /// final segment.
    pub fn compile(spec: &str) -> Result<RoutePattern, PatternError> {
        let trimmed = spec.trim_start_matches('/').trim_end_matches('/');
        let mut segments = Vec::new();
        let mut seen_params: Vec<&str> = Vec::new();

        if !trimmed.is_empty() {
            for piece in trimmed.split('/') {
                if piece.is_empty() {
                    return Err(PatternError::EmptySegment {
                        spec: spec.to_string(),
                    });
                }
                // Any earlier wildcard makes this segment interior to it.
                if matches!(segments.last(), Some(Segment::Wildcard)) {
                    return Err(PatternError::InteriorWildcard {
                        spec: spec.to_string(),
                    });
                }
                if let Some(name) = piece.strip_prefix(':') {
                    if !valid_param_name(name) {
                        return Err(PatternError::InvalidParamName {
                            spec: spec.to_string(),
                            name: name.to_string(),
                        });
                    }
                    if seen_params.contains(&name) {
                        return Err(PatternError::DuplicateParam {
                            spec: spec.to_string(),
                            name: name.to_string(),
                        });
                    }
                    seen_params.push(name);
                    segments.push(Segment::Param(name.to_string()));
                } else if piece == "*" {
                    segments.push(Segment::Wildcard);
                } else {
                    segments.push(Segment::Literal(piece.to_string()));
                }
            }
        }

        Ok(RoutePattern {
            raw: spec.to_string(),
            segments,
        })
    }

    /// The raw path spec this pattern was compiled from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The compiled segments, in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Normalize a request path into its non-empty segments.
    ///
    /// Drops the query string, leading/trailing slashes and empty segments,
    /// so `/a//b/` and `a/b` normalize identically and the empty path
    /// normalizes to root.
    pub fn split_path(path: &str) -> Vec<&str> {
        let path = path.split('?').next().unwrap_or("");
        path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Align this pattern against normalized request segments.
    ///
    /// Literals must match exactly, a param matches any single segment and
    /// binds its percent-decoded value, and a trailing wildcard captures the
    /// raw remainder, including an empty remainder, so `/files/*` matches
    /// `/files` with capture `""`. Returns `None` when the segment counts
    /// cannot be reconciled.
    pub fn matches(&self, request: &[&str]) -> Option<PathBindings> {
        let mut bindings = PathBindings::default();
        let mut i = 0usize;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    if request.get(i) != Some(&text.as_str()) {
                        return None;
                    }
                    i += 1;
                }
                Segment::Param(name) => {
                    let value = request.get(i)?;
                    bindings.params.insert(name.clone(), decode_segment(value));
                    i += 1;
                }
                Segment::Wildcard => {
                    bindings.wildcard = Some(request[i..].join("/"));
                    return Some(bindings);
                }
            }
        }

        if i == request.len() {
            Some(bindings)
        } else {
            None
        }
    }
}

/// Percent-decode a bound parameter value, falling back to the raw text when
/// the segment is not valid percent-encoding.
fn decode_segment(value: &str) -> String {
    urlencoding::decode(value)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}
