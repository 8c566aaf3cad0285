use std::io::{Read, Write};

pub trait Classifier: Sized {
	/// Index into `classes()` of the predicted label.
	fn predict(&self, x: &[f64]) -> usize;

	fn classes(&self) -> &[String];
	fn features_len(&self) -> usize;

	fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;
	fn deserialize<R: Read>(reader: &mut R) -> std::io::Result<Self>;

	fn predict_label(&self, x: &[f64]) -> &str {
		&self.classes()[self.predict(x)]
	}
}
