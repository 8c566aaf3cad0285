use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};

use classifier::Classifier;
use error::Result;
use logistic_regression::{LogisticRegression, LogisticRegressionBuilder};

mod classifier;
mod csv_data;
mod dataset;
mod error;
mod feature_repo;
mod functions;
mod logging;
mod logistic_regression;

const DEFAULT_DATASET: &str = "data/iris.csv";
const DEFAULT_MODEL: &str = "model.bin";

#[derive(Debug, Parser)]
#[command(name = "iris-pipeline", version, about = "Train and query an iris species classifier")]
struct Cli {
	/// Defaults to `fit` with the default paths.
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Fit a classifier on a labeled CSV file and save it
	Fit(FitArgs),
	/// Predict the label of one feature vector
	Predict {
		#[arg(long, default_value = DEFAULT_MODEL)]
		model: PathBuf,
		#[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
		features: Vec<f64>,
	},
	/// Classify a labeled CSV file and report the classification rate
	Evaluate {
		#[arg(long, default_value = DEFAULT_DATASET)]
		dataset: PathBuf,
		#[arg(long, default_value = DEFAULT_MODEL)]
		model: PathBuf,
		/// Write one predicted label per row to this file
		#[arg(long)]
		output: Option<PathBuf>,
	},
	/// Print the iris feature view as TOML
	Describe,
}

#[derive(Debug, Clone, Args)]
struct FitArgs {
	#[arg(long, default_value = DEFAULT_DATASET)]
	dataset: PathBuf,
	#[arg(long, default_value = DEFAULT_MODEL)]
	model: PathBuf,
	#[arg(long, default_value_t = 200)]
	max_iter: u64,
	/// Gradient tolerance at which the solver stops
	#[arg(long, default_value_t = 1e-4)]
	tolerance: f64,
	/// Hold out this fraction of rows, in [0, 1), to report a test classification rate
	#[arg(long, default_value_t = 0.0)]
	test_rate: f64,
	/// Seed for the hold-out shuffle
	#[arg(long, env = "IRIS_SEED")]
	seed: Option<u64>,
}

impl Default for FitArgs {
	fn default() -> Self {
		Self {
			dataset: PathBuf::from(DEFAULT_DATASET),
			model: PathBuf::from(DEFAULT_MODEL),
			max_iter: 200,
			tolerance: 1e-4,
			test_rate: 0.0,
			seed: None,
		}
	}
}

fn fit(args: &FitArgs) -> Result<LogisticRegression> {
	if !(0.0..1.0).contains(&args.test_rate) {
		return Err(error::Error::TestRate(args.test_rate));
	}

	tracing::info!("Reading dataset {} ...", args.dataset.display());
	let builder = csv_data::read(&args.dataset)?;

	let view = feature_repo::iris_feature_view();
	if !builder.header().iter().map(String::as_str).eq(view.field_names()) {
		tracing::debug!("columns {:?} differ from feature view {:?}, using column positions", builder.header(), view.name);
	}

	let dataset = builder.build();
	let classifier_builder = LogisticRegressionBuilder {
		max_iter: args.max_iter,
		tolerance: args.tolerance,
		..Default::default()
	};

	let model = if args.test_rate > 0.0 {
		let mut rng = match args.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};

		let (train, test) = dataset.train_test_split(&mut rng, args.test_rate);
		tracing::info!("Fitting model [max_iter: {}] on {} rows, {} held out ...", args.max_iter, train.rows_len(), test.rows_len());
		let model = classifier_builder.fit(&train)?;

		tracing::info!("Classification rate test: {:.3}%", test.evaluate(&model) * 100.0);
		tracing::info!("Classification rate train: {:.3}%", train.evaluate(&model) * 100.0);
		model
	} else {
		tracing::info!("Fitting model [max_iter: {}] on {} rows ...", args.max_iter, dataset.rows_len());
		classifier_builder.fit(&dataset)?
	};

	let mut file = BufWriter::new(File::create(&args.model)?);
	model.serialize(&mut file)?;

	tracing::debug!("saved {} with classes {}", args.model.display(), model.classes().join(", "));

	Ok(model)
}

fn load_model<P: AsRef<Path>>(model_location: P) -> Result<LogisticRegression> {
	let mut file = BufReader::new(File::open(model_location)?);
	Ok(LogisticRegression::deserialize(&mut file)?)
}

fn predict(model_location: &Path, features: &[f64]) -> Result<String> {
	let model = load_model(model_location)?;
	let label = model.classify(features)?;
	tracing::debug!("probabilities {:?} for classes {:?}", model.predict_proba(features), model.classes());

	Ok(label.to_owned())
}

fn evaluate(dataset_location: &Path, model_location: &Path, output_location: Option<&Path>) -> Result<f64> {
	tracing::info!("Reading evaluation dataset {} ...", dataset_location.display());
	let builder = csv_data::read(dataset_location)?;
	let dataset = builder.build();

	tracing::info!("Reading serialized model {} ...", model_location.display());
	let model = load_model(model_location)?;

	if dataset.features_len() != model.features_len() {
		return Err(error::Error::FeatureWidth { expected: model.features_len(), found: dataset.features_len() });
	}

	let rate = dataset.evaluate(&model);
	tracing::info!("Classification rate: {:.3}% over {} rows", rate * 100.0, dataset.rows_len());

	if let Some(output_location) = output_location {
		tracing::info!("Writing classified data to {} ...", output_location.display());
		let mut file = BufWriter::new(File::create(output_location)?);

		for label in dataset.classify(&model) {
			writeln!(&mut file, "{}", label)?;
		}
		file.flush()?;
	}

	Ok(rate)
}

fn fit_and_report(args: &FitArgs) -> Result<()> {
	fit(args)?;
	println!("Model trained and saved as {}", args.model.display());

	Ok(())
}

fn run(cli: Cli) -> Result<()> {
	match cli.command {
		None => fit_and_report(&FitArgs::default())?,
		Some(Command::Fit(args)) => fit_and_report(&args)?,
		Some(Command::Predict { model, features }) => {
			println!("{}", predict(&model, &features)?);
		},
		Some(Command::Evaluate { dataset, model, output }) => {
			evaluate(&dataset, &model, output.as_deref())?;
		},
		Some(Command::Describe) => {
			print!("{}", feature_repo::iris_feature_view().to_toml()?);
		},
	}

	Ok(())
}

fn main() -> ExitCode {
	logging::init();

	match run(Cli::parse()) {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			tracing::error!("{}", e);
			ExitCode::FAILURE
		},
	}
}
