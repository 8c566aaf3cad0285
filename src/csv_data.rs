use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use crate::dataset;
use crate::error::{Error, Result};

/// Reads a labeled CSV file: a header row, then rows whose last field is the
/// label and whose other fields are numeric features.
pub fn read<P: AsRef<Path>>(dataset_location: P) -> Result<dataset::Builder> {
	let path = dataset_location.as_ref();
	let file = fs::File::open(path)?;
	let mut lines = io::BufReader::new(file).lines();

	let header = match lines.next() {
		Some(line) => split_fields(&line?),
		None => return Err(Error::EmptyDataset { path: path.to_path_buf() }),
	};

	if header.len() < 2 {
		return Err(Error::TooFewColumns { path: path.to_path_buf(), found: header.len() });
	}

	let mut builder = dataset::Builder::new();
	let width = header.len();
	builder.set_header(header);

	for (i, line) in lines.enumerate() {
		let line = line?;
		let line_number = i + 2;

		if line.trim().is_empty() {
			continue;
		}

		let fields = split_fields(&line);
		if fields.len() != width {
			return Err(Error::RowWidth {
				path: path.to_path_buf(),
				line: line_number,
				expected: width,
				found: fields.len(),
			});
		}

		let (label, features) = fields.split_last()
			.ok_or_else(|| Error::EmptyDataset { path: path.to_path_buf() })?;

		let x = features
			.iter()
			.enumerate()
			.map(|(column, value)| parse_feature(value).ok_or_else(|| Error::Parse {
				path: path.to_path_buf(),
				line: line_number,
				column: column + 1,
				value: value.clone(),
			}))
			.collect::<Result<Vec<f64>>>()?;

		builder.add(&x, label);
	}

	if builder.rows_len() == 0 {
		return Err(Error::EmptyDataset { path: path.to_path_buf() });
	}

	tracing::debug!("read {} rows from {}", builder.rows_len(), path.display());

	Ok(builder)
}

fn split_fields(line: &str) -> Vec<String> {
	line.split(',')
		.map(|x| x.trim().trim_matches('"').to_owned())
		.collect()
}

fn parse_feature(value: &str) -> Option<f64> {
	value.parse::<f64>()
		.ok()
		.filter(|x| x.is_finite())
}
