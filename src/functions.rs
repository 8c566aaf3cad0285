use num_traits::Float;
use ordered_float::OrderedFloat;

pub fn dot<T: Float>(a: &[T], b: &[T]) -> T {
	a.iter()
		.zip(b)
		.fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// Softmax over `values`, shifted by the maximum so `exp` cannot overflow.
pub fn softmax<T: Float>(values: &mut [T]) {
	let max = values
		.iter()
		.fold(T::neg_infinity(), |acc, &x| acc.max(x));

	let mut sum = T::zero();
	for value in values.iter_mut() {
		*value = (*value - max).exp();
		sum = sum + *value;
	}

	for value in values.iter_mut() {
		*value = *value / sum;
	}
}

/// Index of the largest value; the first one wins on ties.
pub fn argmax(values: &[f64]) -> usize {
	values
		.iter()
		.enumerate()
		.rev()
		.max_by_key(|&(_, &v)| OrderedFloat(v))
		.map(|(i, _)| i)
		.unwrap_or(0)
}

/// Mean and standard deviation of `values`. A constant column gets scale 1.
pub fn mean_and_scale(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
	let (sum, len) = values.clone().fold((0.0, 0usize), |(s, n), x| (s + x, n + 1));
	if len == 0 {
		return (0.0, 1.0);
	}

	let mean = sum / len as f64;
	let variance = values.map(|x| (x - mean).powi(2)).sum::<f64>() / len as f64;
	let scale = variance.sqrt();

	if scale > std::f64::EPSILON {
		(mean, scale)
	} else {
		(mean, 1.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn softmax_sums_to_one() {
		let mut values = [1.0, 2.0, 1000.0];
		softmax(&mut values);

		assert!((values.iter().sum::<f64>() - 1.0).abs() < 1e-12);
		assert!(values[2] > 0.99);
	}

	#[test]
	fn argmax_prefers_first_on_ties() {
		assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), 1);
		assert_eq!(argmax(&[3.0]), 0);
	}

	#[test]
	fn constant_column_has_unit_scale() {
		assert_eq!(mean_and_scale([2.0, 2.0, 2.0].iter().copied()), (2.0, 1.0));

		let (mean, scale) = mean_and_scale([1.0, 3.0].iter().copied());
		assert_eq!(mean, 2.0);
		assert_eq!(scale, 1.0);

		let (_, scale) = mean_and_scale([0.0, 4.0].iter().copied());
		assert_eq!(scale, 2.0);
	}
}
