//! Object descriptors and the setup pass that builds them from
//! command-line tokens.
//!
//! Tokens are consumed left to right. An integer token sets the
//! replication count for every following mesh until the next integer;
//! any other token names a mesh. Rotation flags are looked up by the
//! token's position among *all* arguments, so with `2 a.stl 3 b.stl`
//! and `--rot 1,0`, `a.stl` (position 1) reads flag `0` and `b.stl`
//! (position 3) falls back to the default.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::progress::Timed;
use std::sync::Arc;

/// Divisor applied to the cube root of the total volume.
pub const DEVIATION_DIVISOR: f64 = 32.0;

/// One distinct mesh argument together with how many copies to pack.
#[derive(Debug, Clone)]
pub struct ObjectDescriptor {
    /// Centered geometry, shared by every copy.
    pub mesh: Arc<Mesh>,
    /// Number of copies, at least 1.
    pub count: usize,
    /// Whether the engine may re-orient copies of this mesh.
    pub rotation_allowed: bool,
}

/// Per-argument rotation allowance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationPolicy {
    flags: Vec<bool>,
}

impl RotationPolicy {
    pub fn new(flags: Vec<bool>) -> Self {
        Self { flags }
    }

    /// Parses a comma-separated list such as `1,0,true,F`.
    ///
    /// An empty string allows rotation everywhere.
    pub fn parse(list: &str) -> Result<Self> {
        if list.is_empty() {
            return Ok(Self::default());
        }
        let flags = list.split(',').map(parse_bool).collect::<Result<Vec<_>>>()?;
        Ok(Self { flags })
    }

    /// Rotation allowance for the argument at `position`; true when the
    /// list is exhausted.
    pub fn allowed(&self, position: usize) -> bool {
        self.flags.get(position).copied().unwrap_or(true)
    }
}

fn parse_bool(token: &str) -> Result<bool> {
    match token {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(Error::Config(format!(
            "invalid rotation flag {other:?}, expected 1/0/true/false"
        ))),
    }
}

/// Parses an integer token with an optional sign and `0x`, `0o`, `0b`
/// or leading-zero octal prefix. `_` may separate digits, as in `1_000`
/// or `0x_ff`. Returns `None` for anything that is not an integer, which
/// makes the token a mesh reference.
fn parse_integer(token: &str) -> Option<i64> {
    let (negative, body) = match token.as_bytes().first().copied()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };
    let lower = body.to_ascii_lowercase();
    if lower.contains('_') && !underscores_separate_digits(&lower) {
        return None;
    }
    let (radix, digits) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };
    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let value = i64::from_str_radix(&digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

/// Every `_` sits between two digits, where a base prefix counts as a digit.
fn underscores_separate_digits(body: &str) -> bool {
    let bytes = body.as_bytes();
    let hex = bytes.starts_with(b"0x");
    let prefixed = hex || bytes.starts_with(b"0o") || bytes.starts_with(b"0b");

    let mut after_digit = prefixed;
    let mut after_underscore = false;
    for &b in &bytes[if prefixed { 2 } else { 0 }..] {
        if b.is_ascii_digit() || (hex && b.is_ascii_hexdigit()) {
            after_digit = true;
            after_underscore = false;
        } else if b == b'_' {
            if !after_digit {
                return false;
            }
            after_digit = false;
            after_underscore = true;
        } else {
            if after_underscore {
                return false;
            }
            after_digit = false;
        }
    }
    !after_underscore
}

/// The immutable result of setup: every descriptor plus the summed
/// bounding-box volume of the loaded meshes.
#[derive(Debug, Clone)]
pub struct ObjectSet {
    objects: Vec<ObjectDescriptor>,
    total_volume: f64,
}

impl ObjectSet {
    pub fn objects(&self) -> &[ObjectDescriptor] {
        &self.objects
    }

    /// Sum of one bounding-box volume per mesh argument.
    pub fn total_volume(&self) -> f64 {
        self.total_volume
    }

    /// Number of instances the engine will place.
    pub fn instance_count(&self) -> usize {
        self.objects.iter().map(|o| o.count).sum()
    }

    /// Perturbation scale for the engine's move generator:
    /// `cbrt(total_volume) / 32`.
    pub fn deviation(&self) -> f64 {
        self.total_volume.cbrt() / DEVIATION_DIVISOR
    }
}

/// Accumulates descriptors while tokens are consumed.
#[derive(Debug, Clone)]
pub struct ObjectSetBuilder {
    rotation: RotationPolicy,
    count: usize,
    objects: Vec<ObjectDescriptor>,
    total_volume: f64,
}

impl ObjectSetBuilder {
    pub fn new(rotation: RotationPolicy) -> Self {
        Self {
            rotation,
            count: 1,
            objects: Vec::new(),
            total_volume: 0.0,
        }
    }

    /// Consumes the token at argument `position`. Mesh tokens are
    /// resolved through `load`.
    pub fn push_token<F>(&mut self, position: usize, token: &str, load: F) -> Result<()>
    where
        F: FnOnce(&str) -> Result<Mesh>,
    {
        if let Some(value) = parse_integer(token) {
            if value < 1 {
                return Err(Error::Config(format!(
                    "replication count must be positive, got {value}"
                )));
            }
            self.count = value as usize;
            return Ok(());
        }

        let mesh = {
            let _t = Timed::start(format!("loading mesh {token}"));
            load(token)?
        };
        self.add_mesh(position, mesh);
        Ok(())
    }

    /// Registers a loaded mesh found at argument `position`, using the
    /// current replication count.
    pub fn add_mesh(&mut self, position: usize, mut mesh: Mesh) {
        let bounds = mesh.bounding_box();
        let size = bounds.size();
        self.total_volume += bounds.volume();
        log::info!("  {} triangles", mesh.triangle_count());
        log::info!("  {} x {} x {}", size.x, size.y, size.z);

        {
            let _t = Timed::start("centering mesh");
            mesh.center();
        }

        self.objects.push(ObjectDescriptor {
            mesh: Arc::new(mesh),
            count: self.count,
            rotation_allowed: self.rotation.allowed(position),
        });
    }

    /// Finishes setup. Fails when no mesh token was seen.
    pub fn build(self) -> Result<ObjectSet> {
        if self.objects.is_empty() {
            return Err(Error::Config("no mesh given".into()));
        }
        Ok(ObjectSet {
            objects: self.objects,
            total_volume: self.total_volume,
        })
    }
}

/// Runs setup over `tokens` in order, stopping at the first error.
pub fn setup_objects<I, S, F>(tokens: I, rotation: RotationPolicy, mut load: F) -> Result<ObjectSet>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: FnMut(&str) -> Result<Mesh>,
{
    let mut builder = ObjectSetBuilder::new(rotation);
    for (position, token) in tokens.into_iter().enumerate() {
        builder.push_token(position, token.as_ref(), &mut load)?;
    }
    builder.build()
}
