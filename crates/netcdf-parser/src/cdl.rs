//! Parsing of CDL text as printed by `ncdump`.
//!
//! Only the parts needed to pull a numeric grid out of a file are understood:
//! dimensions (including `UNLIMITED`), variable declarations, the packing
//! attributes `_FillValue`, `scale_factor` and `add_offset`, and the numeric
//! values of a single variable in the `data:` section.

use std::collections::HashMap;

use crate::error::{NetCdfError, NetCdfResult};

const NUMERIC_TYPES: &[&str] = &[
    "byte", "ubyte", "char", "short", "ushort", "int", "uint", "long", "int64", "uint64", "float",
    "double",
];

/// A variable declaration from a CDL header.
#[derive(Debug, Clone, PartialEq)]
pub struct CdlVariable {
    /// Group path without leading slash, `None` for the root group
    pub group: Option<String>,
    pub name: String,
    pub data_type: String,
    pub dims: Vec<String>,
    pub fill_value: Option<f64>,
    pub scale_factor: Option<f64>,
    pub add_offset: Option<f64>,
}

impl CdlVariable {
    /// Unpack one raw value: fill and non-finite become NaN, then scale/offset apply.
    pub fn unpack(&self, raw: f64) -> f64 {
        if !raw.is_finite() || self.fill_value == Some(raw) {
            return f64::NAN;
        }
        raw * self.scale_factor.unwrap_or(1.0) + self.add_offset.unwrap_or(0.0)
    }
}

/// The structural part of an `ncdump -h` listing.
#[derive(Debug, Clone, Default)]
pub struct CdlHeader {
    /// Dimension lengths keyed by `(group, name)`
    dimensions: HashMap<(Option<String>, String), usize>,
    variables: Vec<CdlVariable>,
}

impl CdlHeader {
    pub fn variables(&self) -> &[CdlVariable] {
        &self.variables
    }

    pub fn variable(&self, group: Option<&str>, name: &str) -> Option<&CdlVariable> {
        self.variables
            .iter()
            .find(|v| v.group.as_deref() == group && v.name == name)
    }

    /// Length of a dimension as seen from `group`, searching outward to the root.
    pub fn dimension_len(&self, group: Option<&str>, name: &str) -> Option<usize> {
        let mut scope = group.map(str::to_string);
        loop {
            if let Some(len) = self.dimensions.get(&(scope.clone(), name.to_string())) {
                return Some(*len);
            }
            scope = match scope {
                Some(path) => path.rsplit_once('/').map(|(parent, _)| parent.to_string()),
                None => return None,
            };
        }
    }

    /// Shape of a declared variable.
    pub fn shape_of(&self, var: &CdlVariable) -> NetCdfResult<Vec<usize>> {
        var.dims
            .iter()
            .map(|dim| {
                self.dimension_len(var.group.as_deref(), dim).ok_or_else(|| {
                    NetCdfError::InvalidFormat(format!(
                        "dimension '{}' of variable '{}' is not declared",
                        dim, var.name
                    ))
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    None,
    Dimensions,
    Variables,
    Data,
}

/// Parse the header of a CDL listing. Anything after `data:` is ignored.
pub fn parse_header(text: &str) -> NetCdfResult<CdlHeader> {
    let mut header = CdlHeader::default();
    let mut groups: Vec<String> = Vec::new();
    let mut section = Section::None;
    let mut saw_root = false;

    for raw_line in text.lines() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if !saw_root {
            if line.starts_with("netcdf ") && line.ends_with('{') {
                saw_root = true;
                continue;
            }
            return Err(NetCdfError::InvalidFormat(format!(
                "expected 'netcdf <name> {{', found '{}'",
                line
            )));
        }

        if let Some(rest) = line.strip_prefix("group:") {
            let name = rest.trim_end_matches('{').trim();
            groups.push(name.to_string());
            section = Section::None;
            continue;
        }
        if line.starts_with('}') {
            groups.pop();
            section = Section::None;
            continue;
        }

        match line {
            "dimensions:" => {
                section = Section::Dimensions;
                continue;
            }
            "variables:" => {
                section = Section::Variables;
                continue;
            }
            "data:" => {
                section = Section::Data;
                continue;
            }
            "types:" => {
                section = Section::None;
                continue;
            }
            _ => {}
        }

        let group = current_group(&groups);
        match section {
            Section::Dimensions => {
                let (name, len) = parse_dimension(raw_line)?;
                header.dimensions.insert((group, name), len);
            }
            Section::Variables => {
                if let Some(var) = parse_declaration(line, group.clone()) {
                    header.variables.push(var);
                } else if let Some((var_name, attr, value)) = parse_attribute(line) {
                    if let Some(var) = header
                        .variables
                        .iter_mut()
                        .rev()
                        .find(|v| v.group == group && v.name == var_name)
                    {
                        match attr {
                            "_FillValue" => var.fill_value = Some(value),
                            "scale_factor" => var.scale_factor = Some(value),
                            "add_offset" => var.add_offset = Some(value),
                            _ => {}
                        }
                    }
                }
            }
            Section::Data | Section::None => {}
        }
    }

    if !saw_root {
        return Err(NetCdfError::InvalidFormat("empty CDL listing".to_string()));
    }
    Ok(header)
}

/// Pull the values of `name` out of the `data:` section of a CDL listing.
///
/// Fill markers (`_`) become NaN.
pub fn parse_data_values(text: &str, name: &str) -> NetCdfResult<Vec<f64>> {
    let mut in_data = false;
    let mut collecting = false;
    let mut values = Vec::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if !in_data {
            in_data = line == "data:";
            continue;
        }

        let body = if collecting {
            line
        } else {
            match line.strip_prefix(name).map(str::trim_start) {
                Some(rest) if rest.starts_with('=') => {
                    collecting = true;
                    &rest[1..]
                }
                _ => continue,
            }
        };

        let (body, done) = match body.split_once(';') {
            Some((before, _)) => (before, true),
            None => (body, false),
        };
        for token in body.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            values.push(parse_number(token)?);
        }
        if done {
            return Ok(values);
        }
    }

    Err(NetCdfError::MissingData(format!(
        "no data for variable '{}' in ncdump output",
        name
    )))
}

/// Parse one CDL numeric literal. `_` is the fill marker.
pub fn parse_number(token: &str) -> NetCdfResult<f64> {
    if token == "_" {
        return Ok(f64::NAN);
    }
    if let Ok(v) = token.parse::<f64>() {
        return Ok(v);
    }
    // Type suffixes: 1.5f, 3s, 7b, 10UL, 12LL
    let trimmed = token.trim_end_matches(['f', 'F', 's', 'S', 'b', 'B', 'l', 'L', 'u', 'U']);
    trimmed
        .parse::<f64>()
        .map_err(|_| NetCdfError::InvalidFormat(format!("invalid number in CDL: '{}'", token)))
}

fn current_group(groups: &[String]) -> Option<String> {
    if groups.is_empty() {
        None
    } else {
        Some(groups.join("/"))
    }
}

fn strip_comment(line: &str) -> &str {
    // String attributes may contain "//", only strip outside quotes.
    let mut in_string = false;
    let bytes = line.as_bytes();
    for i in 0..bytes.len() {
        match bytes[i] {
            b'"' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'/') => return &line[..i],
            _ => {}
        }
    }
    line
}

/// `time = UNLIMITED ; // (1 currently)` or `latitude = 2950 ;`
fn parse_dimension(raw_line: &str) -> NetCdfResult<(String, usize)> {
    let invalid = || NetCdfError::InvalidFormat(format!("invalid dimension line: '{}'", raw_line));

    let (name, rest) = raw_line.split_once('=').ok_or_else(invalid)?;
    let name = name.trim().to_string();
    let value = strip_comment(rest).trim().trim_end_matches(';').trim();

    if value == "UNLIMITED" {
        let current = raw_line
            .split_once("// (")
            .and_then(|(_, tail)| tail.split_whitespace().next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        return Ok((name, current));
    }

    let len = value.parse().map_err(|_| invalid())?;
    Ok((name, len))
}

/// `double vertical_column_troposphere(time, latitude, longitude) ;`
fn parse_declaration(line: &str, group: Option<String>) -> Option<CdlVariable> {
    let (data_type, rest) = line.split_once(char::is_whitespace)?;
    if !NUMERIC_TYPES.contains(&data_type) {
        return None;
    }
    let rest = rest.trim().trim_end_matches(';').trim();

    let (name, dims) = match rest.split_once('(') {
        Some((name, dims)) => {
            let dims = dims.trim_end_matches(')');
            let dims = dims
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
            (name.trim(), dims)
        }
        None => (rest, Vec::new()),
    };

    if name.is_empty() || name.contains(':') {
        return None;
    }

    Some(CdlVariable {
        group,
        name: name.to_string(),
        data_type: data_type.to_string(),
        dims,
        fill_value: None,
        scale_factor: None,
        add_offset: None,
    })
}

/// `var:_FillValue = -1.e+30 ;` for the numeric attributes we care about.
fn parse_attribute(line: &str) -> Option<(&str, &str, f64)> {
    let (target, rest) = line.split_once(':')?;
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    let (attr, value) = rest.split_once('=')?;
    let value = value.trim().trim_end_matches(';').trim();
    // Only single numeric values
    let first = value.split(',').next()?.trim();
    let value = parse_number(first).ok()?;
    Some((target, attr.trim(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = r#"netcdf TEMPO_NO2_L3_V03_20250101T120000Z_S001 {
dimensions:
	latitude = 3 ;
	longitude = 4 ;
	time = UNLIMITED ; // (1 currently)
variables:
	double time(time) ;
		time:units = "seconds since 1980-01-06T00:00:00Z" ;
	float latitude(latitude) ;
		latitude:units = "degrees_north" ;
	float longitude(longitude) ;

// global attributes:
		:title = "TEMPO NO2 // Level 3" ;

group: product {
  variables:
  	double vertical_column_troposphere(time, latitude, longitude) ;
  		vertical_column_troposphere:_FillValue = -1.e+30 ;
  		vertical_column_troposphere:units = "molecules/cm^2" ;
  } // group product

group: support_data {
  variables:
  	short fitted_slant_column(time, latitude, longitude) ;
  		fitted_slant_column:_FillValue = -999s ;
  		fitted_slant_column:scale_factor = 1.e+13f ;
  		fitted_slant_column:add_offset = 0.f ;
  } // group support_data
}
"#;

    #[test]
    fn test_parse_dimensions_including_unlimited() {
        let header = parse_header(HEADER).unwrap();
        assert_eq!(header.dimension_len(None, "latitude"), Some(3));
        assert_eq!(header.dimension_len(None, "time"), Some(1));
        // Root dimensions are visible from groups
        assert_eq!(header.dimension_len(Some("product"), "longitude"), Some(4));
        assert_eq!(header.dimension_len(None, "xtrack"), None);
    }

    #[test]
    fn test_parse_grouped_variables() {
        let header = parse_header(HEADER).unwrap();
        let var = header
            .variable(Some("product"), "vertical_column_troposphere")
            .unwrap();
        assert_eq!(var.data_type, "double");
        assert_eq!(var.dims, vec!["time", "latitude", "longitude"]);
        assert_eq!(var.fill_value, Some(-1.0e30));
        assert_eq!(header.shape_of(var).unwrap(), vec![1, 3, 4]);

        assert!(header.variable(None, "vertical_column_troposphere").is_none());
        assert_eq!(header.variables().len(), 5);
    }

    #[test]
    fn test_packing_attributes() {
        let header = parse_header(HEADER).unwrap();
        let var = header
            .variable(Some("support_data"), "fitted_slant_column")
            .unwrap();
        assert_eq!(var.fill_value, Some(-999.0));
        assert_eq!(var.unpack(2.0), 2.0e13);
        assert!(var.unpack(-999.0).is_nan());
    }

    #[test]
    fn test_rejects_non_cdl() {
        assert!(parse_header("HDF5 \"file.nc\" {").is_err());
        assert!(parse_header("").is_err());
    }

    #[test]
    fn test_parse_data_section() {
        let dump = format!(
            "{}\ndata:\n\n group: product {{\n  data:\n\n   vertical_column_troposphere =\n  1.5e+15, _, 3,\n    4 ;\n  }} // group product\n}}\n",
            HEADER.trim_end().trim_end_matches('}')
        );
        let values = parse_data_values(&dump, "vertical_column_troposphere").unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(values[0], 1.5e15);
        assert!(values[1].is_nan());
        assert_eq!(values[3], 4.0);
    }

    #[test]
    fn test_parse_data_single_line() {
        let dump = "netcdf x {\ndata:\n\n time = 42 ;\n}\n";
        assert_eq!(parse_data_values(dump, "time").unwrap(), vec![42.0]);
        assert!(parse_data_values(dump, "latitude").is_err());
    }

    #[test]
    fn test_parse_number_suffixes() {
        assert_eq!(parse_number("1.e+13f").unwrap(), 1.0e13);
        assert_eq!(parse_number("-999s").unwrap(), -999.0);
        assert_eq!(parse_number("7b").unwrap(), 7.0);
        assert!(parse_number("NaNf").unwrap().is_nan());
        assert_eq!(parse_number("Infinityf").unwrap(), f64::INFINITY);
        assert_eq!(parse_number("-Infinity").unwrap(), f64::NEG_INFINITY);
        assert!(parse_number("abc").is_err());
    }
}
