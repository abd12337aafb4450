use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "nbk")]
#[command(about = "Drive a NotebookLM account from the command line")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Session record location (default: ~/.config/nbk/session.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub session_file: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Manage the saved authentication session
	#[command(subcommand)]
	Auth(AuthCommand),

	/// List, create, or delete notebooks
	#[command(subcommand)]
	Notebook(NotebookCommand),

	/// Add sources to a notebook
	#[command(subcommand)]
	Source(SourceCommand),

	/// Ask a question against a notebook's sources
	Query {
		/// Notebook id
		notebook: String,
		question: String,
	},

	/// Start and poll long-form research jobs
	#[command(subcommand)]
	Research(ResearchCommand),

	/// Inspect studio artifact generation
	#[command(subcommand)]
	Studio(StudioCommand),

	/// Generate a mind map over sources from one notebook
	Mindmap {
		/// Source ids (at least one)
		#[arg(required = true)]
		sources: Vec<String>,
	},
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
	/// Interactive login: opens a browser window and captures the session
	Login {
		/// Give up after this many seconds
		#[arg(short, long, default_value = "300", value_name = "SECONDS")]
		timeout: u64,
	},
	/// Show the saved session (cookie names only, never values)
	Show,
	/// Repair a saved cookie string by dropping duplicate names
	Fix,
	/// Delete the saved session
	Clear,
}

#[derive(Subcommand, Debug)]
pub enum NotebookCommand {
	/// List notebooks in service order
	List,
	/// Create a notebook
	Create {
		/// Title (default: timestamp-based)
		#[arg(short, long)]
		title: Option<String>,
	},
	/// Delete a notebook you own
	Delete {
		/// Notebook id
		notebook: String,
	},
}

#[derive(Subcommand, Debug)]
pub enum SourceCommand {
	/// Add pasted text as a source
	AddText {
		/// Notebook id
		notebook: String,
		/// Source name
		#[arg(short, long)]
		name: String,
		/// Inline text (mutually exclusive with --file)
		#[arg(long, conflicts_with = "file")]
		text: Option<String>,
		/// Read the text from a file
		#[arg(long, value_name = "FILE")]
		file: Option<PathBuf>,
	},
	/// Add a URL source (fetched by the service)
	AddUrl {
		/// Notebook id
		notebook: String,
		url: String,
	},
}

#[derive(Subcommand, Debug)]
pub enum ResearchCommand {
	/// Start a research job
	Start {
		/// Notebook id
		notebook: String,
		topic: String,
		/// Research depth: fast or deep
		#[arg(short, long, default_value = "fast")]
		depth: nbk::ResearchDepth,
		/// Restrict research to these source ids
		#[arg(long = "source", value_name = "ID")]
		sources: Vec<String>,
	},
	/// One status snapshot of the outstanding research job
	Poll {
		/// Notebook id
		notebook: String,
	},
	/// Poll until the job reaches a terminal state
	Wait {
		/// Notebook id
		notebook: String,
		/// Seconds between polls
		#[arg(long, default_value = "10", value_name = "SECONDS")]
		interval: u64,
		/// Give up (stop polling, server keeps working) after this many seconds
		#[arg(long, default_value = "900", value_name = "SECONDS")]
		timeout: u64,
	},
}

#[derive(Subcommand, Debug)]
pub enum StudioCommand {
	/// Status of artifact generation jobs on a notebook
	Status {
		/// Notebook id
		notebook: String,
	},
}
