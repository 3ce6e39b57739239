use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use lesson_forge::{
    ActivityGenerator,
    backend::build_backend,
    catalog::{ActivityFilter, available_subjects},
    document::{DocumentLibrary, DocumentParser, data_url},
    export::{DEFAULT_FILE_NAME, to_markdown},
    models::{
        Activity, DocumentStatus, FormConfiguration, Level, Pillar, UploadedDocument,
        document::media_type_for_extension,
    },
    shared::{GeneratorConfig, init_tracing},
    storage::{ActivityStore, StorageBackend, open_storage},
};

#[derive(Parser)]
#[command(name = "lesson-forge", version, about = "Generate BNCC-aligned classroom activities")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "LESSON_FORGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate activities and save them
    Generate(GenerateArgs),
    /// List saved activities
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print JSON instead of one line per activity
        #[arg(long)]
        json: bool,
    },
    /// Export saved activities as Markdown
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Destination file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Change fields of a saved activity
    Edit(EditArgs),
    /// Delete a saved activity
    Delete { id: String },
    /// Subjects that have saved activities
    Subjects,
    /// Manage supporting documents
    #[command(subcommand)]
    Docs(DocsCommand),
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long, default_value = "Matemática")]
    subject: String,
    #[arg(long, default_value = "Frações")]
    topic: String,
    #[arg(long, default_value = "6º Ano")]
    grade: String,
    #[arg(long, default_value = "Algoritmos")]
    pillar: Pillar,
    #[arg(long, default_value = "Médio")]
    level: Level,
    #[arg(short, long, default_value_t = 1)]
    quantity: u8,
    /// Extra documents read for this request only
    #[arg(short, long = "doc")]
    docs: Vec<PathBuf>,
    /// Also use the documents selected in the library
    #[arg(long)]
    selected: bool,
}

#[derive(Args)]
struct EditArgs {
    id: String,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    bncc: Option<String>,
    #[arg(long)]
    bncc_computing: Option<String>,
    /// Minutes
    #[arg(long)]
    duration: Option<u32>,
    /// Replaces the resource list; repeat for several
    #[arg(long = "resource")]
    resources: Vec<String>,
}

impl EditArgs {
    /// Returns whether anything changed.
    fn apply(self, activity: &mut Activity) -> bool {
        let target = &mut activity.generated;
        let mut changed = false;
        let mut set = |slot: &mut String, value: Option<String>| {
            if let Some(value) = value.filter(|v| *v != *slot) {
                *slot = value;
                changed = true;
            }
        };
        set(&mut target.title, self.title);
        set(&mut target.description, self.description);
        set(&mut target.bncc_competency, self.bncc);
        set(&mut target.bncc_computing_competency, self.bncc_computing);
        if let Some(minutes) = self.duration
            && minutes != target.estimated_duration
        {
            target.estimated_duration = minutes;
            changed = true;
        }
        if !self.resources.is_empty() && self.resources != target.required_resources {
            target.required_resources = self.resources;
            changed = true;
        }
        changed
    }
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    pillar: Option<Pillar>,
    #[arg(long)]
    level: Option<Level>,
    #[arg(long)]
    topic: Option<String>,
    /// Free text matched against title and description
    #[arg(long)]
    query: Option<String>,
}

impl From<FilterArgs> for ActivityFilter {
    fn from(args: FilterArgs) -> Self {
        ActivityFilter {
            subject: args.subject,
            pillar: args.pillar,
            level: args.level,
            topic: args.topic,
            query: args.query,
        }
    }
}

#[derive(Subcommand)]
enum DocsCommand {
    /// Add files to the library
    Add { paths: Vec<PathBuf> },
    /// Remove a document by id
    Remove { id: String },
    /// Toggle whether a document is used as context
    Select { id: String },
    /// List documents
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<DocumentStatus>,
    },
    /// Remove every document
    Clear,
}

fn parse_status(s: &str) -> Result<DocumentStatus, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
        .map_err(|_| format!("unknown status: {s} (pending, ready, failed)"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = GeneratorConfig::load(cli.config.as_deref()).await?;
    init_tracing(&config.log_level);

    let storage = open_storage(&config.storage_kind())?;
    info!(backend = ?config.backend, storage = ?config.storage_kind(), "lesson-forge starting");

    match cli.command {
        Command::Generate(args) => generate(&config, storage, args).await?,
        Command::List { filter, json } => {
            let store = ActivityStore::new(storage);
            let activities = store.filtered(&filter.into()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&activities)?);
            } else if activities.is_empty() {
                println!("Nenhuma atividade encontrada.");
            } else {
                for activity in &activities {
                    println!(
                        "{}  {} [{} | {} | {} | {}]",
                        activity.id,
                        activity.title(),
                        activity.subject,
                        activity.grade,
                        activity.level,
                        activity.pillar
                    );
                }
            }
        }
        Command::Export { filter, output } => {
            let store = ActivityStore::new(storage);
            let activities = store.filtered(&filter.into()).await?;
            let markdown = to_markdown(&activities)?;
            match output {
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(DEFAULT_FILE_NAME)
                    } else {
                        path
                    };
                    tokio::fs::write(&path, markdown).await?;
                    println!("{} atividade(s) exportada(s) para {}", activities.len(), path.display());
                }
                None => print!("{markdown}"),
            }
        }
        Command::Edit(args) => {
            let store = ActivityStore::new(storage);
            let id = args.id.clone();
            let Some(mut activity) = store.get(&id).await? else {
                println!("Atividade {id} não encontrada.");
                return Ok(());
            };
            if args.apply(&mut activity) {
                store.update(activity).await?;
                println!("Atividade {id} atualizada.");
            } else {
                println!("Nada a alterar em {id}.");
            }
        }
        Command::Delete { id } => {
            let store = ActivityStore::new(storage);
            if store.delete(&id).await? {
                println!("Atividade {id} removida.");
            } else {
                println!("Atividade {id} não encontrada.");
            }
        }
        Command::Subjects => {
            let activities = ActivityStore::new(storage).list().await?;
            for subject in available_subjects(&activities) {
                println!("{subject}");
            }
        }
        Command::Docs(command) => docs(DocumentLibrary::new(storage), command).await?,
    }
    Ok(())
}

async fn generate(
    config: &GeneratorConfig,
    storage: Arc<dyn StorageBackend>,
    args: GenerateArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let form = FormConfiguration::new(
        args.subject,
        args.topic,
        args.grade,
        args.pillar,
        args.level,
        args.quantity,
    );

    let mut documents = Vec::new();
    if args.selected {
        documents.extend(DocumentLibrary::new(storage.clone()).selected_snapshot().await?);
    }
    for path in &args.docs {
        documents.push(read_transient(path).await);
    }

    let backend = build_backend(config)?;
    let generator = ActivityGenerator::from_config(
        config,
        backend,
        DocumentParser::with_builtin_extractors(),
    );

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let report = match generator.generate_until(&form, &documents, cancel).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    for skipped in &report.skipped_documents {
        eprintln!("Documento ignorado: {} ({})", skipped.name, skipped.error);
    }
    if report.context_truncated {
        eprintln!("Os documentos de apoio foram truncados para caber no limite do modelo.");
    }

    let store = ActivityStore::new(storage);
    let added = store.add_generated(&form, report.activities).await?;
    for activity in &added {
        println!("{}  {}", activity.id, activity.title());
    }
    println!("{} atividade(s) gerada(s).", added.len());
    Ok(())
}

/// A document read for one request, never stored. A read failure yields a
/// failed entry that generation ignores.
async fn read_transient(path: &Path) -> UploadedDocument {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let media_type = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(media_type_for_extension)
        .unwrap_or_default();

    let mut document = UploadedDocument::pending(name, media_type);
    match tokio::fs::read(path).await {
        Ok(bytes) => document.mark_ready(data_url::encode(media_type, &bytes)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read document");
            document.mark_failed(e.to_string());
        }
    }
    document
}

async fn docs(library: DocumentLibrary, command: DocsCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        DocsCommand::Add { paths } => {
            for path in paths {
                let document = library.upload_path(&path, None).await?;
                match document.status {
                    DocumentStatus::Failed => println!(
                        "{}  {} falhou: {}",
                        document.id,
                        document.name,
                        document.error_message.as_deref().unwrap_or("erro desconhecido")
                    ),
                    _ => println!("{}  {}", document.id, document.name),
                }
            }
        }
        DocsCommand::Remove { id } => {
            if !library.remove(&id).await? {
                println!("Documento {id} não encontrado.");
            }
        }
        DocsCommand::Select { id } => {
            let selected = library.toggle_selection(&id).await?;
            println!(
                "Documento {id} {}.",
                if selected { "selecionado" } else { "desmarcado" }
            );
        }
        DocsCommand::List { status } => {
            let documents = library.filter_by_status(status).await?;
            let selected = library.selected_ids().await?;
            for document in documents {
                let mark = if selected.contains(&document.id) { "*" } else { " " };
                println!(
                    "{mark} {}  {} ({}, {:?})",
                    document.id, document.name, document.media_type, document.status
                );
            }
        }
        DocsCommand::Clear => library.clear().await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_forge::models::GeneratedActivity;

    fn saved() -> Activity {
        let generated = GeneratedActivity {
            title: "Receita de bolo".into(),
            description: "texto".into(),
            bncc_competency: "EF06MA07".into(),
            bncc_computing_competency: "EF06CO01".into(),
            estimated_duration: 50,
            required_resources: vec!["quadro".into()],
        };
        Activity::from_generated(generated, &FormConfiguration::default())
    }

    #[test]
    fn edit_changes_only_given_fields() {
        let cli = Cli::parse_from([
            "lesson-forge", "edit", "abc", "--title", "Pizza de frações", "--duration", "40",
            "--resource", "cartolina", "--resource", "tesoura",
        ]);
        let Command::Edit(args) = cli.command else {
            panic!("expected edit");
        };
        let mut activity = saved();
        assert!(args.apply(&mut activity));
        assert_eq!(activity.title(), "Pizza de frações");
        assert_eq!(activity.description(), "texto");
        assert_eq!(activity.generated.estimated_duration, 40);
        assert_eq!(activity.generated.required_resources, vec!["cartolina", "tesoura"]);
    }

    #[test]
    fn edit_without_changes_reports_none() {
        let cli = Cli::parse_from(["lesson-forge", "edit", "abc", "--title", "Receita de bolo"]);
        let Command::Edit(args) = cli.command else {
            panic!("expected edit");
        };
        assert!(!args.apply(&mut saved()));
    }
}
