use std::{fmt, fs, path::Path, str::FromStr};

/// Marker token opening the solver line that lists the independent support.
pub const MARKER: &str = "v";

/// An ordered set of variable indices reported by one extraction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CandidateSupport {
    vars: Vec<u32>,
}

impl CandidateSupport {
    pub fn new(vars: Vec<u32>) -> Self {
        Self { vars }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn vars(&self) -> &[u32] {
        &self.vars
    }

    /// `c ind` annotation understood by approximate model counters.
    pub fn cind(&self) -> String {
        if self.is_empty() {
            "c ind 0".to_string()
        } else {
            format!("c ind {self} 0")
        }
    }
}

impl fmt::Display for CandidateSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for v in self.vars.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{v}")?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSupportError(String);

impl fmt::Display for ParseSupportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid support line: {}", self.0)
    }
}

impl std::error::Error for ParseSupportError {}

impl FromStr for CandidateSupport {
    type Err = ParseSupportError;

    /// Parses a marker line such as `v 1 5 7 0`. The marker is optional and
    /// a trailing `0` terminator is dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace().peekable();
        if tokens.peek() == Some(&MARKER) {
            tokens.next();
        }
        let mut vars = tokens
            .map(|t| t.parse::<u32>().map_err(|_| ParseSupportError(s.trim().to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        if vars.last() == Some(&0) {
            vars.pop();
        }
        Ok(Self { vars })
    }
}

/// Returns the first line of extractor output whose leading token is the
/// marker, verbatim.
pub fn marker_line(output: &str) -> Option<&str> {
    output
        .lines()
        .find(|l| l.split_whitespace().next() == Some(MARKER))
}

/// `None` means no usable marker line, which is an extraction failure and
/// not a support of size zero.
pub fn parse_output(output: &str) -> Option<CandidateSupport> {
    marker_line(output)?.parse().ok()
}

pub fn parse_output_file(path: impl AsRef<Path>) -> anyhow::Result<Option<CandidateSupport>> {
    let output = fs::read_to_string(path)?;
    Ok(parse_output(&output))
}
