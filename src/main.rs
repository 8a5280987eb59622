// CLI binary entry point for oggflac

mod cli;

use cli::commands;
use cli::{Commands, Config, OutputFormatter};

use clap::Parser;
use std::process;

fn main() {
    let config = Config::parse();

    env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .init();

    let formatter = OutputFormatter::new(config.format, config.quiet);

    let result = match &config.command {
        Commands::Detect { files } => commands::command_detect(files, &formatter),
        Commands::Read { files, fields, output } => {
            commands::command_read(files, fields.as_deref(), output.as_deref(), &formatter)
        }
        Commands::Info { files } => commands::command_info(files, &formatter),
        Commands::Write { file, set, remove, from_file } => {
            commands::command_write(file, set, remove, from_file.as_deref(), &formatter)
        }
        Commands::RemovePictures { files } => commands::command_remove_pictures(files, &formatter),
        Commands::ExportCover { file, output, index } => {
            commands::command_export_cover(file, output, *index, &formatter)
        }
    };

    if let Err(e) = result {
        formatter.print_error(&format!("{:#}", e));
        process::exit(1);
    }
}
