use clap::{Parser, Subcommand, ValueEnum};
use opencomp_kernel::{Direction, LevelType, NodeKind, VisibilityMode};

#[derive(Parser)]
#[command(
    name = "opencomp",
    about = "OpenComp: competency taxonomies with visibility cascades, sibling order, and editor grants",
    version
)]
pub struct Cli {
    /// Path to the taxonomy JSONL store [default: .opencomp/taxonomy.jsonl]
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Acting user (omit for anonymous)
    #[arg(long = "as", global = true, value_name = "ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to a TOML config file [default: .opencomp/config.toml]
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Reject the edit unless the store still has this snapshot ref
    #[arg(long, global = true, value_name = "REF")]
    pub expect_snapshot: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, list, and inspect schools
    School {
        #[command(subcommand)]
        command: SchoolCommands,
    },

    /// Create, inspect, and edit hierarchy nodes
    Node {
        #[command(subcommand)]
        command: NodeCommands,
    },

    /// Publish or hide nodes
    Visibility {
        #[command(subcommand)]
        command: VisibilityCommands,
    },

    /// Read and change sibling order
    Order {
        #[command(subcommand)]
        command: OrderCommands,
    },

    /// Grant editor rights
    Grant {
        #[command(subcommand)]
        command: GrantCommands,
    },

    /// Ask whether the acting user may edit a school or subject area
    CanEdit {
        /// School ID
        school: u64,

        /// Narrow the question to one subject area
        #[arg(long)]
        subject_area: Option<u64>,
    },

    /// Manage pathways (saved cross-cutting selections)
    Pathway {
        #[command(subcommand)]
        command: PathwayCommands,
    },

    /// Render the summary of one subject area
    Summary {
        /// Subject area ID
        subject_area: u64,
    },

    /// Report order lists that drifted from their live children
    Check {
        /// Persist the repaired lists
        #[arg(long)]
        repair: bool,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum SchoolCommands {
    /// Create a school owned by the acting user
    Add {
        /// School name
        name: String,
    },

    /// List every school
    List,

    /// Show one school with its subject areas
    Show {
        /// School ID
        id: u64,
    },

    /// Rename the level aliases a school uses
    Alias {
        /// School ID
        id: u64,

        /// Alias for competency areas
        #[arg(long)]
        competency_area: Option<String>,

        /// Alias for essential understandings
        #[arg(long)]
        essential_understanding: Option<String>,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum NodeCommands {
    /// Create a node under a parent
    Add {
        /// Parent node ID
        parent: u64,

        /// Kind of node to create
        #[arg(value_enum)]
        kind: KindArg,

        /// Node label
        label: String,

        #[arg(long)]
        description: Option<String>,

        /// Student-facing wording (levels, essential understandings, learning targets)
        #[arg(long)]
        student_friendly: Option<String>,

        /// Level type (levels only)
        #[arg(long, value_enum)]
        level_type: Option<LevelTypeArg>,
    },

    /// Show one node
    Show {
        /// Node ID
        id: u64,
    },

    /// Edit node fields; visibility and order are left alone
    Update {
        /// Node ID
        id: u64,

        #[arg(long)]
        label: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        student_friendly: Option<String>,

        #[arg(long, value_enum)]
        level_type: Option<LevelTypeArg>,
    },

    /// List the children of one kind, in order
    Children {
        /// Parent node ID
        parent: u64,

        #[arg(value_enum)]
        kind: KindArg,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum VisibilityCommands {
    /// Change one node's visibility
    Set {
        /// Node ID
        id: u64,

        #[arg(value_enum)]
        mode: ModeArg,
    },

    /// Apply several changes as one unit (`ID=MODE` each)
    Batch {
        #[arg(required = true, value_name = "ID=MODE")]
        changes: Vec<String>,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum OrderCommands {
    /// Print the order list of one kind under a parent
    Get {
        parent: u64,

        #[arg(value_enum)]
        kind: KindArg,
    },

    /// Replace the order list with a full permutation
    Set {
        parent: u64,

        #[arg(value_enum)]
        kind: KindArg,

        /// Child IDs in the new order
        #[arg(required = true, num_args = 1..)]
        ids: Vec<u64>,
    },

    /// Swap a child with its neighbour
    Move {
        parent: u64,

        child: u64,

        #[arg(value_enum)]
        direction: DirectionArg,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum GrantCommands {
    /// Grant editor rights over a whole school
    School {
        /// Grantee
        user: String,

        /// School ID
        school: u64,
    },

    /// Grant editor rights over one subject area
    SubjectArea {
        /// Grantee
        user: String,

        /// Subject area ID
        subject_area: u64,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum PathwayCommands {
    /// Create a pathway in a school
    Add {
        /// School ID
        school: u64,

        /// Pathway name
        name: String,
    },

    /// Add a node to the pathway selection
    Select { pathway: u64, node: u64 },

    /// Remove a node, pruning selections that depended on it
    Deselect { pathway: u64, node: u64 },

    /// Show the selected nodes the acting user may see
    Show { pathway: u64 },

    /// List what the pathway may select next
    Candidates {
        pathway: u64,

        #[arg(value_enum)]
        kind: KindArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    #[value(name = "subject-area", alias = "sa")]
    SubjectArea,
    #[value(name = "subdiscipline-area", alias = "sda")]
    SubdisciplineArea,
    #[value(name = "competency-area", alias = "ca")]
    CompetencyArea,
    #[value(name = "level")]
    Level,
    #[value(name = "essential-understanding", alias = "eu")]
    EssentialUnderstanding,
    #[value(name = "learning-target", alias = "lt")]
    LearningTarget,
}

impl From<KindArg> for NodeKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::SubjectArea => NodeKind::SubjectArea,
            KindArg::SubdisciplineArea => NodeKind::SubdisciplineArea,
            KindArg::CompetencyArea => NodeKind::CompetencyArea,
            KindArg::Level => NodeKind::Level,
            KindArg::EssentialUnderstanding => NodeKind::EssentialUnderstanding,
            KindArg::LearningTarget => NodeKind::LearningTarget,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LevelTypeArg {
    #[value(name = "apprentice")]
    Apprentice,
    #[value(name = "technician")]
    Technician,
    #[value(name = "master")]
    Master,
    #[value(name = "professional")]
    Professional,
}

impl From<LevelTypeArg> for LevelType {
    fn from(arg: LevelTypeArg) -> Self {
        match arg {
            LevelTypeArg::Apprentice => LevelType::Apprentice,
            LevelTypeArg::Technician => LevelType::Technician,
            LevelTypeArg::Master => LevelType::Master,
            LevelTypeArg::Professional => LevelType::Professional,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ModeArg {
    #[value(name = "public")]
    Public,
    #[value(name = "cascade-public")]
    CascadePublic,
    #[value(name = "private")]
    Private,
}

impl From<ModeArg> for VisibilityMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Public => VisibilityMode::Public,
            ModeArg::CascadePublic => VisibilityMode::CascadePublic,
            ModeArg::Private => VisibilityMode::Private,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DirectionArg {
    #[value(name = "up")]
    Up,
    #[value(name = "down")]
    Down,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Up => Direction::Up,
            DirectionArg::Down => Direction::Down,
        }
    }
}
