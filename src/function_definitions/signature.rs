//! Generalized-ufunc signatures such as `(m,n),(n)->(m)`.
//!
//! Each argument and the result have a list of named *core* dimensions,
//! always the trailing axes. The remaining leading axes form the *loop*
//! shape, over which the core function is broadcast.

use crate::quib_error::QuibError;
use hashbrown::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Signature {
    pub args: Vec<Vec<String>>,
    pub result: Vec<String>,
}

impl Signature {
    /// `nargs` scalar arguments and a scalar result.
    pub fn scalar(nargs: usize) -> Self {
        Signature {
            args: vec![Vec::new(); nargs],
            result: Vec::new(),
        }
    }

    pub fn nargs(&self) -> usize {
        self.args.len()
    }

    pub fn arg_core_ndim(&self, arg: usize) -> usize {
        self.args.get(arg).map_or(0, Vec::len)
    }

    pub fn result_core_ndim(&self) -> usize {
        self.result.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.result.is_empty() && self.args.iter().all(Vec::is_empty)
    }

    /// Split `shape` into loop and core parts for a declared core rank.
    pub fn split(shape: &[usize], core_ndim: usize) -> Result<(&[usize], &[usize]), QuibError> {
        if shape.len() < core_ndim {
            return Err(QuibError::InvalidArgument(format!(
                "array of shape {shape:?} has fewer than {core_ndim} core dimensions"
            )));
        }
        Ok(shape.split_at(shape.len() - core_ndim))
    }

    /// Core dimension sizes bound by the argument core shapes; a name bound
    /// twice must agree.
    pub fn bind(&self, core_shapes: &[&[usize]]) -> Result<HashMap<String, usize>, QuibError> {
        let mut sizes = HashMap::new();
        for (names, shape) in self.args.iter().zip(core_shapes) {
            for (name, &n) in names.iter().zip(shape.iter()) {
                match sizes.get(name) {
                    Some(&bound) if bound != n => {
                        return Err(QuibError::InvalidArgument(format!(
                            "core dimension {name} is {bound} and {n} in {self}"
                        )));
                    }
                    Some(_) => {}
                    None => {
                        sizes.insert(name.clone(), n);
                    }
                }
            }
        }
        Ok(sizes)
    }
}

fn parse_group(group: &str) -> Result<Vec<String>, QuibError> {
    let inner = group
        .trim()
        .strip_prefix('(')
        .and_then(|g| g.strip_suffix(')'))
        .ok_or_else(|| QuibError::InvalidArgument(format!("bad signature group {group:?}")))?;
    let names: Vec<String> = inner
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .collect();
    if let Some(bad) = names.iter().find(|n| !n.chars().all(|c| c.is_alphanumeric() || c == '_')) {
        return Err(QuibError::InvalidArgument(format!("bad core dimension name {bad:?}")));
    }
    Ok(names)
}

/// Groups of a comma-separated list of parenthesized groups.
fn split_groups(list: &str) -> Result<Vec<&str>, QuibError> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| QuibError::InvalidArgument(format!("unbalanced signature {list:?}")))?;
            }
            ',' if depth == 0 => {
                groups.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(QuibError::InvalidArgument(format!("unbalanced signature {list:?}")));
    }
    groups.push(&list[start..]);
    Ok(groups)
}

impl FromStr for Signature {
    type Err = QuibError;

    fn from_str(s: &str) -> Result<Self, QuibError> {
        let (args, result) = s
            .split_once("->")
            .ok_or_else(|| QuibError::InvalidArgument(format!("signature {s:?} has no '->'")))?;
        let args = split_groups(args)?
            .into_iter()
            .map(parse_group)
            .collect::<Result<Vec<_>, _>>()?;
        let result = parse_group(result)?;
        Ok(Signature { args, result })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let group = |names: &[String]| format!("({})", names.join(","));
        let args: Vec<String> = self.args.iter().map(|a| group(a)).collect();
        write!(f, "{}->{}", args.join(","), group(&self.result))
    }
}
