//! Free-form MPS exchange bridge.
//!
//! A model round-trips through [`write_mps`] and [`parse_mps`] with bounds,
//! names, coefficients, and objective direction preserved. Infinite bounds
//! are encoded structurally (`FR`/`MI` entries, absent `UP`/`RHS` entries,
//! free `N` rows), so they deserialize back to exactly infinite values
//! rather than a large finite stand-in. Numbers are written in Rust's
//! shortest round-trip decimal form.

use crate::error::Error;
use crate::model::{Model, VarId, VarKind};

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till1};
use nom::character::complete::{multispace0, multispace1, one_of, space1};
use nom::combinator::opt;
use nom::multi::many0;
use nom::number::complete::double;
use nom::sequence::preceded;
use nom::IResult;

use log::error;

use std::collections::{HashMap, HashSet};

const RESERVED: &[&str] = &[
    "NAME", "OBJSENSE", "ROWS", "COLUMNS", "RHS", "RANGES", "BOUNDS", "ENDATA", "MARKER",
];

/// Serialize a model to free-form MPS text.
///
/// Empty names get positional fallbacks (`x3`, `r1`); names containing
/// whitespace, reserved section keywords, or duplicates are rejected since
/// the format could not read them back unambiguously.
pub fn write_mps(model: &Model) -> Result<String, Error> {
    let col_names = collect_names(model.var_names(), "x")?;
    let row_names = collect_names(model.constraint_names(), "r")?;

    let mut obj_name = "COST".to_string();
    while row_names.iter().any(|n| *n == obj_name) || col_names.iter().any(|n| *n == obj_name) {
        obj_name.push('_');
    }

    let mut out = String::new();
    out.push_str("NAME exported\n");

    if model.maximize() {
        out.push_str("OBJSENSE\n  MAX\n");
    }

    out.push_str("ROWS\n");
    out.push_str(&format!(" N  {}\n", obj_name));

    for (row, name) in model.constraints().iter().zip(&row_names) {
        let kind = row_kind(row.lb(), row.ub());
        out.push_str(&format!(" {}  {}\n", kind, name));
    }

    // per-variable row entries, so each column is written contiguously
    let mut col_entries: Vec<Vec<(usize, f64)>> = vec![Vec::new(); model.num_vars()];

    for (r, row) in model.constraints().iter().enumerate() {
        for &(v, coeff) in row.coeffs() {
            col_entries[v].push((r, coeff));
        }
    }

    out.push_str("COLUMNS\n");

    for (j, name) in col_names.iter().enumerate() {
        let var = &model.variables()[j];
        let integer = var.kind().is_integer();

        if integer {
            out.push_str(&format!("  M{}  'MARKER'  'INTORG'\n", j));
        }

        // the objective entry is always present, so otherwise-unreferenced
        // columns survive the round trip
        out.push_str(&format!(
            "  {}  {}  {}\n",
            name,
            obj_name,
            model.objective_coefficients()[j]
        ));

        for &(r, coeff) in &col_entries[j] {
            out.push_str(&format!("  {}  {}  {}\n", name, row_names[r], coeff));
        }

        if integer {
            out.push_str(&format!("  M{}  'MARKER'  'INTEND'\n", j));
        }
    }

    out.push_str("RHS\n");

    for (row, name) in model.constraints().iter().zip(&row_names) {
        let rhs = match row_kind(row.lb(), row.ub()) {
            'G' | 'E' => row.lb(),
            'L' => row.ub(),
            _ => continue,
        };

        if rhs != 0. {
            out.push_str(&format!("  RHS  {}  {}\n", name, rhs));
        }
    }

    let mut ranges = String::new();

    for (row, name) in model.constraints().iter().zip(&row_names) {
        if row_kind(row.lb(), row.ub()) == 'G' && row.ub().is_finite() {
            ranges.push_str(&format!("  RNG  {}  {}\n", name, row.ub() - row.lb()));
        }
    }

    if !ranges.is_empty() {
        out.push_str("RANGES\n");
        out.push_str(&ranges);
    }

    let mut bounds = String::new();

    for (j, name) in col_names.iter().enumerate() {
        let var = &model.variables()[j];
        let (lb, ub) = (var.lb(), var.ub());

        if var.kind() == VarKind::Binary {
            // BV first; overrides follow so tightened bounds keep the kind
            bounds.push_str(&format!("  BV  BND  {}\n", name));

            if lb == ub {
                bounds.push_str(&format!("  FX  BND  {}  {}\n", name, lb));
            } else {
                if lb != 0. && lb.is_finite() {
                    bounds.push_str(&format!("  LO  BND  {}  {}\n", name, lb));
                }

                if ub != 1. && ub.is_finite() {
                    bounds.push_str(&format!("  UP  BND  {}  {}\n", name, ub));
                }
            }

            continue;
        }

        if lb == ub {
            bounds.push_str(&format!("  FX  BND  {}  {}\n", name, lb));
            continue;
        }

        if lb.is_infinite() && ub.is_infinite() {
            bounds.push_str(&format!("  FR  BND  {}\n", name));
            continue;
        }

        if lb.is_infinite() {
            bounds.push_str(&format!("  MI  BND  {}\n", name));
        } else if lb != 0. {
            bounds.push_str(&format!("  LO  BND  {}  {}\n", name, lb));
        }

        if ub.is_finite() {
            bounds.push_str(&format!("  UP  BND  {}  {}\n", name, ub));
        }
    }

    if !bounds.is_empty() {
        out.push_str("BOUNDS\n");
        out.push_str(&bounds);
    }

    out.push_str("ENDATA\n");
    Ok(out)
}

/// Rebuild a model from free-form MPS text produced by [`write_mps`] (or a
/// compatible writer). The first `N` row is the objective; later `N` rows
/// become free constraints.
pub fn parse_mps(input: &str) -> Result<Model, Error> {
    let (_, file) = parse_file(input).map_err(|e| {
        error!("failed to parse exchange text: {}", e);
        Error::Format(e.to_string())
    })?;

    build_model(file)
}

impl std::convert::TryFrom<&str> for Model {
    type Error = Error;

    fn try_from(mps: &str) -> Result<Self, Self::Error> {
        parse_mps(mps)
    }
}

fn row_kind(lb: f64, ub: f64) -> char {
    if lb.is_infinite() && ub.is_infinite() {
        'N'
    } else if lb == ub {
        'E'
    } else if lb.is_finite() {
        'G'
    } else {
        'L'
    }
}

fn collect_names(raw: Vec<&str>, prefix: &str) -> Result<Vec<String>, Error> {
    let mut names = Vec::with_capacity(raw.len());
    let mut seen = HashSet::new();

    for (index, name) in raw.into_iter().enumerate() {
        let resolved = if name.is_empty() {
            format!("{}{}", prefix, index)
        } else {
            if name.chars().any(char::is_whitespace) || RESERVED.contains(&name) {
                return Err(Error::Format(format!(
                    "name {:?} cannot be serialized",
                    name
                )));
            }

            name.to_string()
        };

        if !seen.insert(resolved.clone()) {
            return Err(Error::Format(format!(
                "duplicate name {:?} cannot be serialized",
                resolved
            )));
        }

        names.push(resolved);
    }

    Ok(names)
}

enum ColLine {
    Marker(bool),
    Entry { col: String, row: String, value: f64 },
}

struct BoundLine {
    kind: String,
    col: String,
    value: Option<f64>,
}

struct MpsFile {
    maximize: bool,
    rows: Vec<(char, String)>,
    column_lines: Vec<ColLine>,
    rhs: Vec<(String, f64)>,
    ranges: Vec<(String, f64)>,
    bounds: Vec<BoundLine>,
}

fn token(i: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(i)
}

fn parse_file(i: &str) -> IResult<&str, MpsFile> {
    let (i, _) = multispace0(i)?;
    let (i, _) = tag("NAME")(i)?;
    let (i, _name) = opt(preceded(space1, token))(i)?;

    let (i, _) = multispace0(i)?;
    let (i, sense) = opt(parse_objsense)(i)?;

    let (i, _) = multispace0(i)?;
    let (i, _) = tag("ROWS")(i)?;
    let (i, rows) = many0(parse_row_decl)(i)?;

    let (i, _) = multispace0(i)?;
    let (i, _) = tag("COLUMNS")(i)?;
    let (i, column_lines) = many0(parse_col_line)(i)?;

    let (i, _) = multispace0(i)?;
    let (i, rhs) = opt(parse_rhs)(i)?;

    let (i, _) = multispace0(i)?;
    let (i, ranges) = opt(parse_ranges)(i)?;

    let (i, _) = multispace0(i)?;
    let (i, bounds) = opt(parse_bounds)(i)?;

    let (i, _) = multispace0(i)?;
    let (i, _) = tag("ENDATA")(i)?;

    Ok((
        i,
        MpsFile {
            maximize: sense.unwrap_or(false),
            rows,
            column_lines,
            rhs: rhs.unwrap_or_default(),
            ranges: ranges.unwrap_or_default(),
            bounds: bounds.unwrap_or_default(),
        },
    ))
}

fn parse_objsense(i: &str) -> IResult<&str, bool> {
    let (i, _) = tag("OBJSENSE")(i)?;
    let (i, _) = multispace1(i)?;
    let (i, sense) = alt((tag("MAX"), tag("MIN")))(i)?;
    Ok((i, sense == "MAX"))
}

fn parse_row_decl(i: &str) -> IResult<&str, (char, String)> {
    let (i, _) = multispace1(i)?;
    let (i, kind) = one_of("NLGE")(i)?;
    let (i, _) = space1(i)?;
    let (i, name) = token(i)?;
    Ok((i, (kind, name.to_string())))
}

fn parse_col_line(i: &str) -> IResult<&str, ColLine> {
    let (i, _) = multispace1(i)?;
    alt((parse_marker, parse_col_entry))(i)
}

fn parse_marker(i: &str) -> IResult<&str, ColLine> {
    let (i, _set) = token(i)?;
    let (i, _) = space1(i)?;
    let (i, _) = tag("'MARKER'")(i)?;
    let (i, _) = space1(i)?;
    let (i, kind) = alt((tag("'INTORG'"), tag("'INTEND'")))(i)?;
    Ok((i, ColLine::Marker(kind == "'INTORG'")))
}

fn parse_col_entry(i: &str) -> IResult<&str, ColLine> {
    let (i, col) = token(i)?;
    let (i, _) = space1(i)?;
    let (i, row) = token(i)?;
    let (i, _) = space1(i)?;
    let (i, value) = double(i)?;

    Ok((
        i,
        ColLine::Entry {
            col: col.to_string(),
            row: row.to_string(),
            value,
        },
    ))
}

/// `<set> <row> <value>` entries, as used by both RHS and RANGES.
fn parse_value_entry(i: &str) -> IResult<&str, (String, f64)> {
    let (i, _) = multispace1(i)?;
    let (i, _set) = token(i)?;
    let (i, _) = space1(i)?;
    let (i, row) = token(i)?;
    let (i, _) = space1(i)?;
    let (i, value) = double(i)?;
    Ok((i, (row.to_string(), value)))
}

fn parse_rhs(i: &str) -> IResult<&str, Vec<(String, f64)>> {
    let (i, _) = tag("RHS")(i)?;
    many0(parse_value_entry)(i)
}

fn parse_ranges(i: &str) -> IResult<&str, Vec<(String, f64)>> {
    let (i, _) = tag("RANGES")(i)?;
    many0(parse_value_entry)(i)
}

fn parse_bounds(i: &str) -> IResult<&str, Vec<BoundLine>> {
    let (i, _) = tag("BOUNDS")(i)?;
    many0(parse_bound_entry)(i)
}

fn parse_bound_entry(i: &str) -> IResult<&str, BoundLine> {
    let (i, _) = multispace1(i)?;
    let (i, kind) = alt((
        tag("LO"),
        tag("UP"),
        tag("FX"),
        tag("FR"),
        tag("MI"),
        tag("PL"),
        tag("BV"),
    ))(i)?;

    let (i, _) = space1(i)?;
    let (i, _set) = token(i)?;
    let (i, _) = space1(i)?;
    let (i, col) = token(i)?;

    let (i, value) = if matches!(kind, "LO" | "UP" | "FX") {
        let (i, value) = preceded(space1, double)(i)?;
        (i, Some(value))
    } else {
        (i, None)
    };

    Ok((
        i,
        BoundLine {
            kind: kind.to_string(),
            col: col.to_string(),
            value,
        },
    ))
}

fn build_model(file: MpsFile) -> Result<Model, Error> {
    let mut obj_row: Option<&str> = None;
    let mut con_rows: Vec<(char, &str)> = Vec::new();

    for (kind, name) in &file.rows {
        if *kind == 'N' && obj_row.is_none() {
            obj_row = Some(name.as_str());
        } else {
            con_rows.push((*kind, name.as_str()));
        }
    }

    let obj_row = obj_row.ok_or_else(|| Error::Format("no objective row".to_string()))?;

    // columns in first-appearance order, with the marker state at that point
    let mut col_order: Vec<(String, bool)> = Vec::new();
    let mut col_index: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<(usize, String, f64)> = Vec::new();
    let mut in_integer_block = false;

    for line in file.column_lines {
        match line {
            ColLine::Marker(start) => in_integer_block = start,

            ColLine::Entry { col, row, value } => {
                let index = match col_index.get(&col) {
                    Some(&index) => index,
                    None => {
                        let index = col_order.len();
                        col_index.insert(col.clone(), index);
                        col_order.push((col, in_integer_block));
                        index
                    }
                };

                entries.push((index, row, value));
            }
        }
    }

    // bound defaults, then bound entries in order
    let mut var_bounds: Vec<(f64, f64, VarKind)> = col_order
        .iter()
        .map(|&(_, integer)| {
            (
                0.,
                f64::INFINITY,
                if integer {
                    VarKind::Integer
                } else {
                    VarKind::Continuous
                },
            )
        })
        .collect();

    for bound in &file.bounds {
        let &index = col_index
            .get(&bound.col)
            .ok_or_else(|| Error::Format(format!("bound for unknown column {:?}", bound.col)))?;

        let slot = &mut var_bounds[index];

        match (bound.kind.as_str(), bound.value) {
            ("LO", Some(v)) => slot.0 = v,
            ("UP", Some(v)) => slot.1 = v,
            ("FX", Some(v)) => {
                slot.0 = v;
                slot.1 = v;
            }
            ("FR", None) => {
                slot.0 = f64::NEG_INFINITY;
                slot.1 = f64::INFINITY;
            }
            ("MI", None) => slot.0 = f64::NEG_INFINITY,
            ("PL", None) => slot.1 = f64::INFINITY,
            ("BV", None) => *slot = (0., 1., VarKind::Binary),
            (kind, _) => {
                return Err(Error::Format(format!("malformed bound entry {:?}", kind)))
            }
        }
    }

    let mut rhs: HashMap<&str, f64> = HashMap::new();

    for (row, value) in &file.rhs {
        rhs.insert(row.as_str(), *value);
    }

    let mut ranges: HashMap<&str, f64> = HashMap::new();

    for (row, value) in &file.ranges {
        ranges.insert(row.as_str(), *value);
    }

    let mut model = Model::new();

    if file.maximize {
        model.set_maximize(true);
    }

    let mut var_ids: Vec<VarId> = Vec::with_capacity(col_order.len());

    for ((name, _), &(lb, ub, kind)) in col_order.iter().zip(&var_bounds) {
        var_ids.push(model.add_var(lb, ub, kind, name.clone())?);
    }

    let mut row_ids = HashMap::new();

    for (kind, name) in &con_rows {
        let b = rhs.get(name).copied().unwrap_or(0.);
        let range = ranges.get(name).copied();

        let (lb, ub) = match kind {
            'N' => (f64::NEG_INFINITY, f64::INFINITY),
            'G' => (b, range.map_or(f64::INFINITY, |r| b + r.abs())),
            'L' => (range.map_or(f64::NEG_INFINITY, |r| b - r.abs()), b),
            'E' => match range {
                None => (b, b),
                Some(r) if r >= 0. => (b, b + r),
                Some(r) => (b + r, b),
            },
            _ => unreachable!("row kinds are restricted by the parser"),
        };

        let id = model.add_constraint(lb, ub, name.to_string())?;
        row_ids.insert(name.to_string(), id);
    }

    for (col, row, value) in entries {
        if row == obj_row {
            model.set_objective_coefficient(var_ids[col], value)?;
        } else {
            let &id = row_ids
                .get(&row)
                .ok_or_else(|| Error::Format(format!("entry for unknown row {:?}", row)))?;
            model.set_coefficient(id, var_ids[col], value)?;
        }
    }

    Ok(model)
}
