use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "adlayers",
    bin_name = "adlayers",
    version,
    disable_help_flag = true,
    disable_help_subcommand = true
)]
#[command(about = "Prioritized ad layers and ad server tags for publishing sites", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Data directory (defaults to $ADLAYERS_HOME, then the user data dir)
    #[arg(long, global = true, help_heading = "Options")]
    pub data_dir: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,

    /// Print help
    #[arg(short, long, global = true)]
    pub help: bool,
}

/// Command group definitions for help output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    Layer,
    Settings,
    Data,
    Render,
}

impl CommandGroup {
    pub fn heading(&self) -> &'static str {
        match self {
            CommandGroup::Layer => "Layer Commands:",
            CommandGroup::Settings => "Settings Commands:",
            CommandGroup::Data => "Data Commands:",
            CommandGroup::Render => "Rendering Commands:",
        }
    }

    pub fn for_command(name: &str) -> Option<Self> {
        match name {
            "add" | "update" | "delete" | "list" | "show" | "reorder" => Some(CommandGroup::Layer),
            "settings" | "variables" => Some(CommandGroup::Settings),
            "export" | "import" => Some(CommandGroup::Data),
            "resolve" | "head" | "unit" | "content" | "widget" | "page-types" | "tags" => {
                Some(CommandGroup::Render)
            }
            _ => None,
        }
    }

    pub fn all() -> &'static [CommandGroup] {
        &[
            CommandGroup::Layer,
            CommandGroup::Settings,
            CommandGroup::Data,
            CommandGroup::Render,
        ]
    }
}

/// Top level help with commands listed by group
pub fn get_grouped_help() -> String {
    let cmd = Cli::command();
    let version = cmd.get_version().unwrap_or("unknown");

    let mut output = String::new();
    output.push_str(&format!("adlayers {version}\n"));
    output.push_str("Prioritized ad layers and ad server tags for publishing sites\n");
    output.push('\n');
    output.push_str("Usage: adlayers [OPTIONS] [COMMAND]\n");

    let subcommands: Vec<_> = cmd.get_subcommands().collect();
    for group in CommandGroup::all() {
        let group_cmds: Vec<_> = subcommands
            .iter()
            .filter(|sc| {
                !sc.is_hide_set() && CommandGroup::for_command(sc.get_name()) == Some(*group)
            })
            .collect();

        if !group_cmds.is_empty() {
            output.push('\n');
            output.push_str(&format!("{}\n", group.heading()));
            for sc in group_cmds {
                let name = sc.get_name();
                let about = sc.get_about().map(|s| s.to_string()).unwrap_or_default();
                output.push_str(&format!("  {:<12} {}\n", name, about));
            }
        }
    }

    output.push('\n');
    output.push_str("Options:\n");
    output.push_str("      --data-dir <DIR>  Data directory\n");
    output.push_str("  -v, --verbose         Verbose output\n");
    output.push_str("  -h, --help            Print help\n");
    output.push_str("  -V, --version         Print version\n");

    output
}

pub fn print_grouped_help() {
    print!("{}", get_grouped_help());
}

/// Prints clap's help for a subcommand by name, falling back to the grouped help
pub fn print_help_for_command(name: &str) {
    let mut cmd = Cli::command();
    for subcmd in cmd.get_subcommands_mut() {
        if subcmd.get_name() == name {
            print!("{}", subcmd.render_help());
            return;
        }
    }
    eprintln!("Unknown command: {}", name);
    eprintln!();
    print_grouped_help();
}

pub fn print_subcommand_help(command: &Option<Commands>) {
    let name = match command {
        Some(Commands::Layer(c)) => match c {
            LayerCommands::Add { .. } => "add",
            LayerCommands::Update { .. } => "update",
            LayerCommands::Delete { .. } => "delete",
            LayerCommands::List => "list",
            LayerCommands::Show { .. } => "show",
            LayerCommands::Reorder { .. } => "reorder",
        },
        Some(Commands::Settings(c)) => match c {
            SettingsCommands::Settings { .. } => "settings",
            SettingsCommands::Variables { .. } => "variables",
        },
        Some(Commands::Data(c)) => match c {
            DataCommands::Export { .. } => "export",
            DataCommands::Import { .. } => "import",
        },
        Some(Commands::Render(c)) => match c {
            RenderCommands::Resolve { .. } => "resolve",
            RenderCommands::Head { .. } => "head",
            RenderCommands::Unit { .. } => "unit",
            RenderCommands::Content { .. } => "content",
            RenderCommands::Widget { .. } => "widget",
            RenderCommands::PageTypes => "page-types",
            RenderCommands::Tags => "tags",
        },
        None => {
            print_grouped_help();
            return;
        }
    };
    print_help_for_command(name);
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Layer(LayerCommands),

    #[command(flatten)]
    Settings(SettingsCommands),

    #[command(flatten)]
    Data(DataCommands),

    #[command(flatten)]
    Render(RenderCommands),
}

/// Layer fields shared by `add` and `update`.
#[derive(Args, Debug, Default)]
pub struct LayerFields {
    /// Post status (publish, draft, pending, future, private, trash)
    #[arg(long)]
    pub status: Option<String>,

    /// Full layer meta as JSON (inline, @file or - for stdin)
    #[arg(long)]
    pub meta: Option<String>,

    /// Page type the layer applies to (repeatable)
    #[arg(long = "page-type")]
    pub page_types: Vec<String>,

    /// Ad unit code to include (repeatable)
    #[arg(long = "ad-unit")]
    pub ad_units: Vec<String>,

    /// Taxonomy whose archives and tagged posts the layer applies to (repeatable)
    #[arg(long)]
    pub taxonomy: Vec<String>,

    /// Post type the layer applies to (repeatable)
    #[arg(long = "post-type")]
    pub post_types: Vec<String>,

    /// Term assigned to the layer, as taxonomy=term_id (repeatable)
    #[arg(long)]
    pub term: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum LayerCommands {
    /// Create a layer
    #[command(alias = "n", display_order = 1)]
    Add {
        /// Layer title
        #[arg(required = true, trailing_var_arg = true)]
        title: Vec<String>,

        #[command(flatten)]
        fields: LayerFields,
    },

    /// Change a layer
    #[command(display_order = 2)]
    Update {
        /// Layer id
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        fields: LayerFields,
    },

    /// Delete a layer
    #[command(alias = "rm", display_order = 3)]
    Delete {
        /// Layer ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },

    /// List layers in priority order
    #[command(alias = "ls", display_order = 4)]
    List,

    /// Show one layer
    #[command(display_order = 5)]
    Show {
        /// Layer id
        id: String,
    },

    /// Set the priority order, highest first
    #[command(display_order = 6)]
    Reorder {
        /// Every prioritized layer id, in the new order
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Ad server settings
    #[command(display_order = 10)]
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Custom targeting variables
    #[command(display_order = 11)]
    Variables {
        #[command(subcommand)]
        action: Option<VariablesAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Save settings from JSON (inline, @file or - for stdin)
    Set { json: String },
    /// Print the stored settings
    Show,
    /// Rebuild the breakpoint cache
    Compile,
    /// Print the settings fields of an ad server
    Fields {
        /// Ad server key (defaults to the configured server)
        server: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum VariablesAction {
    /// Replace the variables
    Set {
        #[arg(num_args = 0..)]
        names: Vec<String>,
    },
    /// Print the variables
    Show,
}

#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// Export settings and layers to a JSON file
    #[command(display_order = 20)]
    Export {
        /// Output file (defaults to {site}.ad_layers.{date}.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import an export file, replacing all layers
    #[command(display_order = 21)]
    Import {
        /// Export file
        path: PathBuf,

        /// Keep options that already exist
        #[arg(long)]
        no_override: bool,
    },
}

/// The page request to render for.
#[derive(Args, Debug, Default)]
pub struct RequestArg {
    /// Request as JSON (inline, @file or - for stdin); defaults to the home page
    #[arg(short, long)]
    pub request: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum RenderCommands {
    /// Print the active layer and page type of a request
    #[command(display_order = 30)]
    Resolve {
        #[command(flatten)]
        request: RequestArg,
    },

    /// Render the page head block
    #[command(display_order = 31)]
    Head {
        #[command(flatten)]
        request: RequestArg,
    },

    /// Render one ad unit
    #[command(display_order = 32)]
    Unit {
        /// Ad unit code
        code: String,

        #[command(flatten)]
        request: RequestArg,
    },

    /// Replace [ad-unit] shortcodes in content (inline, @file or - for stdin)
    #[command(display_order = 33)]
    Content {
        content: String,

        #[command(flatten)]
        request: RequestArg,
    },

    /// Render the ad unit widget, or list its slots when no slot is given
    #[command(display_order = 34)]
    Widget {
        /// Ad unit code of the widget
        slot: Option<String>,

        /// Markup before the widget
        #[arg(long, default_value = "")]
        before: String,

        /// Markup after the widget
        #[arg(long, default_value = "")]
        after: String,

        #[command(flatten)]
        request: RequestArg,
    },

    /// List the page types of the site
    #[command(display_order = 35)]
    PageTypes,

    /// List the formatting tags usable in path templates
    #[command(display_order = 36)]
    Tags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_has_a_group() {
        let cmd = Cli::command();
        for sc in cmd.get_subcommands() {
            assert!(
                CommandGroup::for_command(sc.get_name()).is_some(),
                "{} has no group",
                sc.get_name()
            );
        }
    }

    #[test]
    fn parses_layer_fields() {
        let cli = Cli::try_parse_from([
            "adlayers",
            "add",
            "--status",
            "publish",
            "--page-type",
            "home",
            "--ad-unit",
            "sidebar",
            "Home",
            "Page",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Layer(LayerCommands::Add { title, fields })) => {
                assert_eq!(title, vec!["Home", "Page"]);
                assert_eq!(fields.status.as_deref(), Some("publish"));
                assert_eq!(fields.page_types, vec!["home"]);
                assert_eq!(fields.ad_units, vec!["sidebar"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parses_unit_with_request() {
        let cli = Cli::try_parse_from([
            "adlayers",
            "unit",
            "sidebar",
            "--request",
            r#"{"type":"home"}"#,
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Render(RenderCommands::Unit { .. }))
        ));
    }
}
