use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use foodblock_types::BlockHash;

#[derive(Parser)]
#[command(
    name = "foodblock",
    about = "FoodBlock — content-addressed provenance records",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON-lines block file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Hash a block given as {type, state, refs}
    Hash(HashArgs),
    /// Print the canonical form of a block
    Canonical(InputArgs),
    /// Show the update history of a block, newest first
    Chain(ChainArgs),
    /// Find the latest accepted version of a block
    Head(HeadArgs),
    /// Check whether two heads have diverged
    Conflict(ConflictArgs),
    /// Merge two heads with a whole-state strategy
    Merge(MergeArgs),
    /// Merge two heads field by field
    AutoMerge(AutoMergeArgs),
    /// Reveal selected state fields with a Merkle proof
    Disclose(DiscloseArgs),
    /// Verify a disclosure produced by `disclose`
    VerifyProof(InputArgs),
    /// Commit to every block in the store with a snapshot
    Snapshot(SnapshotArgs),
    /// Verify a snapshot against the store
    VerifySnapshot(VerifySnapshotArgs),
    /// List blocks referencing a block
    Forward(ForwardArgs),
    /// Trace everything downstream of a block
    Recall(RecallArgs),
    /// Show everything a block references, recursively
    Tree(TreeArgs),
    /// Check the integrity of the block file
    Fsck(FsckArgs),
}

#[derive(Args)]
pub struct InputArgs {
    /// JSON input file, or `-` for stdin
    #[arg(default_value = "-")]
    pub input: String,
}

#[derive(Args)]
pub struct HashArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Add the block to the store
    #[arg(long)]
    pub write: bool,
}

#[derive(Args)]
pub struct ChainArgs {
    pub hash: BlockHash,
    #[arg(long)]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct HeadArgs {
    pub hash: BlockHash,
    #[arg(long)]
    pub depth: Option<usize>,
    /// Accept successors from any author
    #[arg(long)]
    pub any_author: bool,
}

#[derive(Args)]
pub struct ConflictArgs {
    pub a: BlockHash,
    pub b: BlockHash,
    #[arg(long)]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct MergeArgs {
    pub a: BlockHash,
    pub b: BlockHash,
    /// manual, a_wins or b_wins
    #[arg(long, default_value = "manual")]
    pub strategy: String,
    /// JSON file with the merged state (manual strategy)
    #[arg(long)]
    pub state: Option<PathBuf>,
    /// Add the merge block to the store
    #[arg(long)]
    pub write: bool,
}

#[derive(Args)]
pub struct AutoMergeArgs {
    pub a: BlockHash,
    pub b: BlockHash,
    /// Field policy as FIELD=POLICY (lww, max, min, union, conflict)
    #[arg(long = "policy")]
    pub policies: Vec<String>,
    /// Add the merge block to the store
    #[arg(long)]
    pub write: bool,
}

#[derive(Args)]
pub struct DiscloseArgs {
    pub hash: BlockHash,
    #[arg(required = true)]
    pub fields: Vec<String>,
}

#[derive(Args)]
pub struct SnapshotArgs {
    #[arg(long)]
    pub summary: Option<String>,
    #[arg(long, requires = "to")]
    pub from: Option<String>,
    #[arg(long, requires = "from")]
    pub to: Option<String>,
    /// Add the snapshot block to the store
    #[arg(long)]
    pub write: bool,
}

#[derive(Args)]
pub struct VerifySnapshotArgs {
    pub hash: BlockHash,
}

#[derive(Args)]
pub struct ForwardArgs {
    pub hash: BlockHash,
}

#[derive(Args)]
pub struct RecallArgs {
    pub hash: BlockHash,
    /// Block type to follow; `ns.*` matches a namespace
    #[arg(long = "type")]
    pub types: Vec<String>,
    /// Ref role to follow
    #[arg(long = "role")]
    pub roles: Vec<String>,
    #[arg(long)]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct TreeArgs {
    pub hash: BlockHash,
    #[arg(long)]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct FsckArgs {}
