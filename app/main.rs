use std::{
    fs::File,
    io::{stdout, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use clap::{Parser, Subcommand};
use derive_more::{Display, From};
use page_store::{
    ancestry::{DateOrder, FirstParent},
    history::HistoryEntry,
    object::{GitObject, Signature},
    object_id::ObjectId,
    repository::{Options, Repository},
    tree_path::TreePath,
};
use serde::Serialize;

#[derive(Parser, Debug)]
struct Arguments {
    #[arg(long, default_value = ".", help = "repository directory")]
    repo: PathBuf,
    #[arg(long, default_value = "main", help = "branch to read and write")]
    branch: String,
    #[arg(long, help = "JSON file with repository options")]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(about = "create the repository layout")]
    Init,
    #[clap(about = "print a stored object")]
    Cat { id: String },
    #[clap(about = "print the content of a page")]
    Show { path: String },
    #[clap(about = "list the pages below a directory")]
    Ls {
        #[arg(default_value = "")]
        path: String,
    },
    #[clap(about = "list the commits at which a page changed, as JSON")]
    History {
        path: String,
        #[arg(long, help = "walk every parent instead of first parents only")]
        all: bool,
    },
    #[clap(about = "store a file as a page and commit it")]
    Write {
        path: String,
        file: PathBuf,
        #[arg(short, long, help = "message to leave with this revision")]
        message: String,
        #[arg(long, default_value = "pagetool <pagetool@localhost>")]
        author: String,
    },
    #[clap(about = "remove a page and commit the removal")]
    Delete {
        path: String,
        #[arg(short, long, help = "message to leave with this revision")]
        message: String,
        #[arg(long, default_value = "pagetool <pagetool@localhost>")]
        author: String,
    },
}

#[derive(Debug, Display, From)]
enum Error {
    #[from]
    Store(page_store::Error),
    #[from]
    #[display(fmt = "I/O error: {}", _0)]
    IO(std::io::Error),
    #[from]
    #[display(fmt = "JSON error: {}", _0)]
    Serde(serde_json::Error),
    #[display(fmt = "{} is not a page", _0)]
    NotAPage(String),
    #[display(fmt = "author must look like \"Name <email>\", got {:?}", _0)]
    BadAuthor(String),
}

#[derive(Serialize)]
struct HistoryLine {
    commit: ObjectId,
    time: i64,
    author: String,
    message: String,
    object: Option<ObjectId>,
}

impl From<&HistoryEntry> for HistoryLine {
    fn from(entry: &HistoryEntry) -> Self {
        let author = &entry.commit.author;
        HistoryLine {
            commit: entry.commit.id(),
            time: entry.commit.committer.time,
            author: format!("{} <{}>", author.name, author.email),
            message: entry.commit.message.trim_end().to_owned(),
            object: entry.resolved.as_ref().map(|o| o.id()),
        }
    }
}

fn load_options(config: Option<&Path>) -> Result<Options, Error> {
    match config {
        Some(path) => Ok(serde_json::from_reader(File::open(path)?)?),
        None => Ok(Options::default()),
    }
}

fn signature(author: &str) -> Result<Signature, Error> {
    let bad = || Error::BadAuthor(author.to_owned());
    let (name, rest) = author.split_once(" <").ok_or_else(bad)?;
    let email = rest.strip_suffix('>').ok_or_else(bad)?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    Ok(Signature::new(name, email, now))
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Arguments::parse();
    let options = load_options(args.config.as_deref())?;
    let branch = args.branch.as_str();
    let mut out = stdout().lock();
    match args.cmd {
        Command::Init => {
            Repository::init(args.repo, &options)?;
        }
        Command::Cat { id } => {
            let repo = Repository::open(args.repo, &options)?;
            let id: ObjectId = id.parse()?;
            let object = repo.get_object(&id)?;
            match object.get() {
                GitObject::Blob(blob) => out.write_all(blob.data())?,
                GitObject::Tree(tree) => {
                    for entry in tree.entries() {
                        writeln!(out, "{} {}\t{}", entry.mode.as_str(), entry.id, entry.name)?;
                    }
                }
                GitObject::Commit(commit) => out.write_all(&commit.serialize())?,
            }
        }
        Command::Show { path } => {
            let repo = Repository::open(args.repo, &options)?;
            let page = repo.page(branch, TreePath::parse(&path)?)?;
            let data = page.data().ok_or_else(|| Error::NotAPage(path.clone()))?;
            out.write_all(data)?;
        }
        Command::Ls { path } => {
            let repo = Repository::open(args.repo, &options)?;
            let page = repo.page(branch, TreePath::parse(&path)?)?;
            if !page.is_tree() {
                return Err(Error::NotAPage(path));
            }
            for entry in page.entries(repo.objects())? {
                writeln!(out, "{}", entry.name())?;
            }
        }
        Command::History { path, all } => {
            let repo = Repository::open(args.repo, &options)?;
            let page = repo.page(branch, TreePath::parse(&path)?)?;
            let entries = if all {
                page.history(repo.objects(), &DateOrder)?
            } else {
                page.history(repo.objects(), &FirstParent)?
            };
            let lines: Vec<HistoryLine> = entries.iter().map(HistoryLine::from).collect();
            serde_json::to_writer_pretty(&mut out, &lines)?;
            writeln!(out)?;
        }
        Command::Write {
            path,
            file,
            message,
            author,
        } => {
            let mut repo = Repository::open(args.repo, &options)?;
            let content = std::fs::read(file)?;
            let commit = repo.commit_page(
                branch,
                &TreePath::parse(&path)?,
                Some(content.as_slice()),
                signature(&author)?,
                &message,
            )?;
            writeln!(out, "{}", commit.id())?;
        }
        Command::Delete {
            path,
            message,
            author,
        } => {
            let mut repo = Repository::open(args.repo, &options)?;
            let commit = repo.commit_page(
                branch,
                &TreePath::parse(&path)?,
                None,
                signature(&author)?,
                &message,
            )?;
            writeln!(out, "{}", commit.id())?;
        }
    }
    Ok(())
}
