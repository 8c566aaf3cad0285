use std::io::{Read, Write};
use std::time::Instant;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use linfa::traits::Fit;
use linfa_logistic::MultiLogisticRegression;
use ndarray::{Array1, Array2};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

use crate::classifier::Classifier;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::functions::{argmax, dot, mean_and_scale, softmax};

const MAGIC: &[u8; 4] = b"IRLR";
const MIN_CLASS_SAMPLES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
enum FormatVersion {
	V1 = 1,
}

const CURRENT_VERSION: FormatVersion = FormatVersion::V1;

#[derive(Debug, Clone)]
pub struct LogisticRegressionBuilder {
	/// Cap on L-BFGS iterations.
	pub max_iter: u64,
	pub tolerance: f64,
	/// Inverse L2 regularization strength.
	pub c: f64,
}

impl Default for LogisticRegressionBuilder {
	fn default() -> Self {
		Self {
			max_iter: 200,
			tolerance: 1e-4,
			c: 1.0,
		}
	}
}

impl LogisticRegressionBuilder {
	/// Fits a multinomial model on standardized features. Every class of the
	/// dataset needs at least two rows.
	pub fn fit(&self, dataset: &Dataset) -> Result<LogisticRegression> {
		let classes = dataset.classes();
		let counts = dataset.class_counts();

		let present = counts.iter().filter(|&&n| n > 0).count();
		if present < 2 {
			return Err(Error::TooFewClasses { found: present });
		}

		if let Some((label, &count)) = classes.iter().zip(&counts).find(|&(_, &n)| n < MIN_CLASS_SAMPLES) {
			return Err(Error::InsufficientSamples {
				label: label.clone(),
				count,
				required: MIN_CLASS_SAMPLES,
			});
		}

		let n_features = dataset.features_len();
		let n_classes = classes.len();

		let (means, scales): (Vec<f64>, Vec<f64>) = (0..n_features)
			.map(|j| mean_and_scale(dataset.column(j)))
			.unzip();

		let records = dataset.rows()
			.flat_map(|x| standardize(&x, &means, &scales))
			.collect::<Vec<f64>>();
		let records = Array2::from_shape_vec((dataset.rows_len(), n_features), records)
			.map_err(|e| Error::Fit(e.to_string()))?;
		let targets = Array1::from(dataset.targets().collect::<Vec<usize>>());

		let start = Instant::now();
		let fitted = MultiLogisticRegression::default()
			.alpha(1.0 / self.c)
			.gradient_tolerance(self.tolerance)
			.max_iterations(self.max_iter)
			.fit(&linfa::Dataset::new(records, targets))
			.map_err(|e| Error::Fit(e.to_string()))?;

		tracing::debug!("fitted {} classes on {} rows in {:.2?}", n_classes, dataset.rows_len(), start.elapsed());

		// Columns of `params` follow the sorted targets, which are 0..n_classes
		// since every class has rows.
		let params = fitted.params();
		let weights = (0..n_classes)
			.map(|c| params.column(c).to_vec())
			.collect::<Vec<_>>();
		let intercepts = fitted.intercept().to_vec();

		Ok(LogisticRegression {
			classes: classes.to_vec(),
			means,
			scales,
			weights,
			intercepts,
		})
	}
}

fn standardize(x: &[f64], means: &[f64], scales: &[f64]) -> Vec<f64> {
	x.iter()
		.zip(means.iter().zip(scales))
		.map(|(v, (m, s))| (v - m) / s)
		.collect()
}

fn logits(weights: &[Vec<f64>], intercepts: &[f64], x: &[f64]) -> Vec<f64> {
	weights
		.iter()
		.zip(intercepts)
		.map(|(w, b)| dot(w, x) + b)
		.collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
	classes: Vec<String>,
	means: Vec<f64>,
	scales: Vec<f64>,
	weights: Vec<Vec<f64>>,
	intercepts: Vec<f64>,
}

impl LogisticRegression {
	/// Class probabilities, indexed like `classes()`.
	pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
		let x = standardize(x, &self.means, &self.scales);
		let mut p = logits(&self.weights, &self.intercepts, &x);
		softmax(&mut p);
		p
	}

	/// Like `predict_label`, but rejects vectors of the wrong width.
	pub fn classify(&self, x: &[f64]) -> Result<&str> {
		if x.len() != self.features_len() {
			return Err(Error::FeatureWidth { expected: self.features_len(), found: x.len() });
		}

		Ok(self.predict_label(x))
	}
}

impl Classifier for LogisticRegression {
	fn predict(&self, x: &[f64]) -> usize {
		let x = standardize(x, &self.means, &self.scales);
		argmax(&logits(&self.weights, &self.intercepts, &x))
	}

	fn classes(&self) -> &[String] {
		&self.classes
	}

	fn features_len(&self) -> usize {
		self.means.len()
	}

	fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
		writer.write_all(MAGIC)?;
		writer.write_u16::<BigEndian>(CURRENT_VERSION as u16)?;
		writer.write_u16::<BigEndian>(length_u16(self.features_len(), "feature count")?)?;
		writer.write_u16::<BigEndian>(length_u16(self.classes.len(), "class count")?)?;

		for label in &self.classes {
			writer.write_u16::<BigEndian>(length_u16(label.len(), "label length")?)?;
			writer.write_all(label.as_bytes())?;
		}

		for &value in self.means.iter().chain(&self.scales) {
			writer.write_f64::<BigEndian>(value)?;
		}

		for &value in self.weights.iter().flatten().chain(&self.intercepts) {
			writer.write_f64::<BigEndian>(value)?;
		}

		writer.flush()
	}

	fn deserialize<R: Read>(reader: &mut R) -> std::io::Result<Self> {
		let mut magic = [0u8; 4];
		reader.read_exact(&mut magic)?;
		if &magic != MAGIC {
			return Err(invalid_data(format!("not a model file (magic {:?})", magic)));
		}

		let version = reader.read_u16::<BigEndian>()?;
		match FormatVersion::from_u16(version) {
			Some(FormatVersion::V1) => {},
			None => return Err(invalid_data(format!("unknown model format version {}", version))),
		}

		let n_features = reader.read_u16::<BigEndian>()? as usize;
		let n_classes = reader.read_u16::<BigEndian>()? as usize;

		let classes = (0..n_classes)
			.map(|_| read_label(reader))
			.collect::<std::io::Result<Vec<String>>>()?;

		let means = read_f64s(reader, n_features)?;
		let scales = read_f64s(reader, n_features)?;
		let weights = (0..n_classes)
			.map(|_| read_f64s(reader, n_features))
			.collect::<std::io::Result<Vec<_>>>()?;
		let intercepts = read_f64s(reader, n_classes)?;

		Ok(Self {
			classes,
			means,
			scales,
			weights,
			intercepts,
		})
	}
}

fn length_u16(len: usize, what: &str) -> std::io::Result<u16> {
	u16::try_from(len).map_err(|_| std::io::Error::new(
		std::io::ErrorKind::InvalidInput,
		format!("{} {} does not fit the model format", what, len),
	))
}

fn read_label<R: Read>(reader: &mut R) -> std::io::Result<String> {
	let len = reader.read_u16::<BigEndian>()? as usize;
	let mut bytes = vec![0u8; len];
	reader.read_exact(&mut bytes)?;

	String::from_utf8(bytes).map_err(|e| invalid_data(format!("label is not utf-8: {}", e)))
}

fn read_f64s<R: Read>(reader: &mut R, len: usize) -> std::io::Result<Vec<f64>> {
	(0..len)
		.map(|_| reader.read_f64::<BigEndian>())
		.collect()
}

fn invalid_data(message: String) -> std::io::Error {
	std::io::Error::new(std::io::ErrorKind::InvalidData, message)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dataset::Builder;

	fn blobs() -> Builder {
		let mut builder = Builder::new();
		for i in 0..10 {
			let d = i as f64 * 0.1;
			builder.add(&[0.0 + d, 0.0 - d], "low");
			builder.add(&[5.0 - d, 5.0 + d], "high");
			builder.add(&[0.0 + d, 5.0 - d], "mixed");
		}
		builder
	}

	#[test]
	fn separates_blobs() {
		let builder = blobs();
		let dataset = builder.build();
		let model = LogisticRegressionBuilder::default().fit(&dataset).unwrap();

		assert_eq!(model.features_len(), 2);
		assert_eq!(model.classes(), &["low", "high", "mixed"]);
		assert_eq!(model.predict_label(&[0.2, -0.2]), "low");
		assert_eq!(model.predict_label(&[4.8, 5.1]), "high");
		assert_eq!(model.predict_label(&[0.1, 4.9]), "mixed");
		assert_eq!(dataset.evaluate(&model), 1.0);

		let p = model.predict_proba(&[0.2, -0.2]);
		assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
	}

	#[test]
	fn fitting_is_deterministic() {
		let builder = blobs();
		let first = LogisticRegressionBuilder::default().fit(&builder.build()).unwrap();
		let second = LogisticRegressionBuilder::default().fit(&builder.build()).unwrap();

		assert_eq!(first, second);
	}

	#[test]
	fn one_row_per_class_fails() {
		let mut builder = Builder::new();
		builder.add(&[1.0], "a");
		builder.add(&[2.0], "b");

		let err = LogisticRegressionBuilder::default().fit(&builder.build()).unwrap_err();
		assert!(matches!(err, Error::InsufficientSamples { count: 1, required: 2, .. }));
	}

	#[test]
	fn single_class_fails() {
		let mut builder = Builder::new();
		builder.add(&[1.0], "a");
		builder.add(&[2.0], "a");

		let err = LogisticRegressionBuilder::default().fit(&builder.build()).unwrap_err();
		assert!(matches!(err, Error::TooFewClasses { found: 1 }));
	}

	#[test]
	fn classify_checks_width() {
		let builder = blobs();
		let model = LogisticRegressionBuilder::default().fit(&builder.build()).unwrap();

		assert!(matches!(model.classify(&[1.0]), Err(Error::FeatureWidth { expected: 2, found: 1 })));
		assert!(model.classify(&[1.0, 1.0]).is_ok());
	}

	#[test]
	fn serialization_round_trips() {
		let builder = blobs();
		let model = LogisticRegressionBuilder::default().fit(&builder.build()).unwrap();

		let mut bytes = Vec::new();
		model.serialize(&mut bytes).unwrap();
		let restored = LogisticRegression::deserialize(&mut bytes.as_slice()).unwrap();

		assert_eq!(model, restored);
	}

	#[test]
	fn iris_converges_before_iteration_cap() {
		let builder = crate::csv_data::read(concat!(env!("CARGO_MANIFEST_DIR"), "/data/iris.csv")).unwrap();
		let dataset = builder.build();

		let capped = LogisticRegressionBuilder::default().fit(&dataset).unwrap();
		let loose = LogisticRegressionBuilder { max_iter: 2000, ..Default::default() }.fit(&dataset).unwrap();

		// A run that stopped on the tolerance is unaffected by a higher cap.
		assert_eq!(capped, loose);
		assert!(dataset.evaluate(&capped) > 0.95);
	}

	#[test]
	fn oversized_lengths_are_not_truncated() {
		let model = LogisticRegression {
			classes: vec!["x".repeat(70_000), "y".to_owned()],
			means: vec![0.0],
			scales: vec![1.0],
			weights: vec![vec![1.0], vec![-1.0]],
			intercepts: vec![0.0, 0.0],
		};

		let mut bytes = Vec::new();
		let err = model.serialize(&mut bytes).unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
	}

	#[test]
	fn rejects_foreign_files() {
		let err = LogisticRegression::deserialize(&mut &b"PK\x03\x04rest"[..]).unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

		let mut bytes = MAGIC.to_vec();
		bytes.extend_from_slice(&[0, 9]);
		let err = LogisticRegression::deserialize(&mut bytes.as_slice()).unwrap_err();
		assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
	}
}
