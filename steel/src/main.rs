//! The steel command line. Parses arguments, calls into `libsteel`, and
//! renders results; every failure goes to stderr with a non-zero exit.
//!
//! Passphrases are taken as `--password` arguments; interactive prompting
//! belongs to whatever shell or wrapper invokes this binary.

use clap::{Parser, Subcommand};
use comfy_table::Table;
use libsteel::{random_password, DatabaseState, Record, StatusReport, Steel, SteelError};
use std::path::PathBuf;
use std::process;
use zeroize::Zeroize;


#[derive(Parser)]
#[command(name = "steel", version, about = "Steel password manager")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Create a new database
	Init {
		path: PathBuf,
	},
	/// Open an existing database
	Open {
		path: PathBuf,
		#[arg(long)]
		password: String,
	},
	/// Close the open database, encrypting it
	Close {
		#[arg(long)]
		password: String,
	},
	/// Add a new entry to the open database
	Add {
		title: String,
		user: String,
		url: String,
		notes: String,
		/// Passphrase to store for the entry; generated when omitted
		#[arg(long)]
		entry_password: Option<String>,
		/// Length of the generated passphrase
		#[arg(long, default_value_t = 16)]
		generate: usize,
	},
	/// Show an entry by id
	Show {
		id: u64,
	},
	/// Show all entries
	List,
	/// Search the database
	Find {
		text: String,
	},
	/// Delete an entry by id
	Delete {
		id: u64,
	},
	/// Replace a field of an entry (title, user, passphrase, url or notes)
	Replace {
		id: u64,
		field: String,
		value: String,
	},
	/// Generate a secure password
	GenPass {
		length: usize,
	},
	/// Copy an encrypted database to a new location
	Backup {
		source: PathBuf,
		destination: PathBuf,
	},
	/// Restore a database backup
	ImportBackup {
		source: PathBuf,
		destination: PathBuf,
	},
	/// Show the status of all known databases
	Status,
	/// Overwrite a database with random data and remove it
	ShredDb {
		path: PathBuf,
	},
	/// Show an entry's passphrase
	ShowPassphrase {
		id: u64,
	},
	/// Show an entry's username
	ShowUsername {
		id: u64,
	},
	/// Show an entry's url
	ShowUrl {
		id: u64,
	},
	/// Show an entry's notes
	ShowNotes {
		id: u64,
	},
}


fn main() {
	tracing_subscriber::fmt::init();

	let cli = Cli::parse();

	if let Err(e) = run(cli) {
		eprintln!("{}", e);
		process::exit(1);
	}
}

fn run(cli: Cli) -> Result<(), SteelError> {
	let steel = Steel::new()?;

	match cli.command {
		Command::Init { path } => {
			steel.init(&path)?;
			println!("Created {}. Close it to encrypt it for the first time.", path.display());
		}
		Command::Open { path, mut password } => {
			let result = steel.open(&path, &password);
			password.zeroize();
			result?;
		}
		Command::Close { mut password } => {
			let result = steel.close(&password);
			password.zeroize();
			result?;
		}
		Command::Add {
			title,
			user,
			url,
			notes,
			entry_password,
			generate,
		} => {
			let mut passphrase = match entry_password {
				Some(p) => p,
				None => random_password(generate)?,
			};
			let result = steel.add(&title, &user, &passphrase, &url, &notes);
			passphrase.zeroize();
			println!("Added entry {}.", result?.id);
		}
		Command::Show { id } => match steel.get(id)? {
			Some(record) => print_records(&[record]),
			None => println!("No entry found with id {}.", id),
		},
		Command::List => print_records(&steel.list()?),
		Command::Find { text } => print_records(&steel.find(&text)?),
		Command::Delete { id } => steel.delete(id)?,
		Command::Replace { id, field, value } => steel.update(id, &field, &value)?,
		Command::GenPass { length } => println!("{}", random_password(length)?),
		Command::Backup { source, destination } => steel.backup(&source, &destination)?,
		Command::ImportBackup { source, destination } => steel.import_backup(&source, &destination)?,
		Command::Status => print_status(&steel.list_status()?),
		Command::ShredDb { path } => steel.remove_database(&path)?,
		Command::ShowPassphrase { id } => print_field(&steel, id, "passphrase")?,
		Command::ShowUsername { id } => print_field(&steel, id, "user")?,
		Command::ShowUrl { id } => print_field(&steel, id, "url")?,
		Command::ShowNotes { id } => print_field(&steel, id, "notes")?,
	}

	Ok(())
}

fn print_field(steel: &Steel, id: u64, field: &str) -> Result<(), SteelError> {
	match steel.show_field(id, field)? {
		Some(value) => println!("{}", value),
		None => println!("No entry found with id {}.", id),
	}
	Ok(())
}

// Column labels live here, not in the data model.
fn print_records(records: &[Record]) {
	let mut table = Table::new();
	table.set_header(vec!["Title", "User", "Passphrase", "Url", "Notes", "Id"]);

	for record in records {
		table.add_row(vec![
			record.title.clone(),
			record.user.clone(),
			record.passphrase.clone(),
			record.url.clone(),
			record.notes.clone(),
			record.id.to_string(),
		]);
	}

	println!("{table}");
}

fn print_status(report: &StatusReport) {
	if let Some(stale) = &report.removed_stale_lock {
		println!("Removed stale session lock for {}.", stale.display());
	}

	let mut table = Table::new();
	table.set_header(vec!["Database", "Status"]);

	for status in &report.databases {
		let state = match status.state {
			DatabaseState::Missing => "missing",
			DatabaseState::Encrypted => "encrypted",
			DatabaseState::Open => "open",
			DatabaseState::Plaintext => "decrypted",
		};
		table.add_row(vec![status.path.display().to_string(), state.to_string()]);
	}

	println!("{table}");
}
