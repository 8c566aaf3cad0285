use crate::classifier::Classifier;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::ops::Range;
use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Clone, Debug)]
pub struct Dataset<'a> {
	columns: &'a [Vec<f64>],
	targets: &'a [usize],
	classes: &'a [String],

	index: Vec<usize>,
	range: Range<usize>,
}

impl<'a, 'b> Dataset<'a> {
	/// Fraction of rows whose label the classifier reproduces. Labels are
	/// compared by name, so the classifier may know a different class set.
	pub fn evaluate<C: Classifier + Sync>(&self, classifier: &C) -> f64 {
		if self.rows_len() == 0 {
			return 0.0;
		}

		self.rows()
			.zip(self.labels())
			.collect::<Vec<_>>()
			.into_par_iter()
			.filter(|(x, y)| classifier.predict_label(x) == *y)
			.count() as f64 / self.rows_len() as f64
	}

	pub fn train_test_split<R: Rng + ?Sized>(mut self, rng: &mut R, test_rate: f64) -> (Self, Self) {
		(&mut self.index[self.range.start..self.range.end]).shuffle(rng);
		let test_num = ((self.rows_len() as f64 * test_rate).round() as usize).min(self.rows_len());

		let mut train = self.clone();
		let mut test = self;
		test.range.end = test.range.start + test_num;
		train.range.start = test.range.end;

		(train, test)
	}

	fn indices(&'b self) -> impl 'b + Iterator<Item = usize> + Clone {
		self.index[self.range.start..self.range.end]
			.iter()
			.copied()
	}

	pub fn targets(&'b self) -> impl 'b + Iterator<Item = usize> {
		self.indices()
			.map(|i| self.targets[i])
	}

	pub fn labels(&'b self) -> impl 'b + Iterator<Item = &'a str> {
		let classes = self.classes;

		self.targets()
			.map(move |t| classes[t].as_str())
	}

	pub fn column(&'b self, column: usize) -> impl 'b + Iterator<Item = f64> + Clone {
		let column = &self.columns[column];

		self.indices()
			.map(|i| column[i])
	}

	pub fn classes(&self) -> &'a [String] {
		self.classes
	}

	/// Number of rows per class, indexed like `classes()`.
	pub fn class_counts(&self) -> Vec<usize> {
		let mut counts = vec![0; self.classes.len()];
		for target in self.targets() {
			counts[target] += 1;
		}

		counts
	}

	pub fn features_len(&self) -> usize {
		self.columns.len()
	}

	pub fn rows_len(&self) -> usize {
		self.range.end - self.range.start
	}

	pub fn rows(&'b self) -> impl 'b + Iterator<Item = Vec<f64>> {
		self.indices().map(move |i| {
			(0..self.columns.len())
				.map(|j| self.columns[j][i])
				.collect()
		})
	}

	pub fn classify<C: Classifier>(&self, classifier: &C) -> Vec<String> {
		self.rows()
			.map(|x| classifier.predict_label(&x).to_owned())
			.collect()
	}
}

#[derive(Debug, Default)]
pub struct Builder {
	header: Vec<String>,
	columns: Vec<Vec<f64>>,
	targets: Vec<usize>,
	classes: Vec<String>,
}

impl Builder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn build(&self) -> Dataset<'_> {
		let range = 0..self.targets.len();

		Dataset {
			columns: &self.columns,
			targets: &self.targets,
			classes: &self.classes,

			range: range.clone(),
			index: range.collect(),
		}
	}

	pub fn set_header(&mut self, header: Vec<String>) {
		self.header = header;
	}

	pub fn header(&self) -> &[String] {
		&self.header
	}

	pub fn rows_len(&self) -> usize {
		self.targets.len()
	}

	/// Adds one sample. Labels become class indices in first-seen order.
	pub fn add(&mut self, x: &[f64], label: &str) {
		if self.columns.is_empty() {
			self.columns = vec![Vec::new(); x.len()];
		}

		for (column, value) in self.columns.iter_mut().zip(x) {
			column.push(*value);
		}

		let target = match self.classes.iter().position(|c| c == label) {
			Some(i) => i,
			None => {
				self.classes.push(label.to_owned());
				self.classes.len() - 1
			}
		};

		self.targets.push(target);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{rngs::StdRng, SeedableRng};

	fn builder() -> Builder {
		let mut builder = Builder::new();
		builder.add(&[1.0, 2.0], "a");
		builder.add(&[3.0, 4.0], "b");
		builder.add(&[5.0, 6.0], "a");
		builder.add(&[7.0, 8.0], "c");
		builder
	}

	#[test]
	fn labels_are_interned_in_order() {
		let builder = builder();
		let dataset = builder.build();

		assert_eq!(dataset.classes(), &["a", "b", "c"]);
		assert_eq!(dataset.targets().collect::<Vec<_>>(), vec![0, 1, 0, 2]);
		assert_eq!(dataset.class_counts(), vec![2, 1, 1]);
		assert_eq!(dataset.features_len(), 2);
	}

	#[test]
	fn rows_are_reassembled_from_columns() {
		let builder = builder();
		let dataset = builder.build();

		let rows = dataset.rows().collect::<Vec<_>>();
		assert_eq!(rows[1], vec![3.0, 4.0]);
		assert_eq!(dataset.column(1).collect::<Vec<_>>(), vec![2.0, 4.0, 6.0, 8.0]);
	}

	#[test]
	fn split_partitions_rows() {
		let builder = builder();
		let mut rng = StdRng::seed_from_u64(7);
		let (train, test) = builder.build().train_test_split(&mut rng, 0.25);

		assert_eq!(test.rows_len(), 1);
		assert_eq!(train.rows_len(), 3);

		let mut all = train.rows().chain(test.rows()).map(|r| r[0] as i64).collect::<Vec<_>>();
		all.sort();
		assert_eq!(all, vec![1, 3, 5, 7]);
	}

	#[test]
	fn oversized_test_rate_takes_every_row() {
		let builder = builder();
		let mut rng = StdRng::seed_from_u64(7);
		let (train, test) = builder.build().train_test_split(&mut rng, 1.5);

		assert_eq!(test.rows_len(), 4);
		assert_eq!(train.rows_len(), 0);
		assert_eq!(train.rows().count(), 0);
	}
}
