use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use foodblock_canonical::canonical_string;
use foodblock_core::{kinds, Block, Map, Refs};
use foodblock_dag::{
    chain, detect_conflict, forward, head, provenance_tree, recall, AcceptancePolicy, Delegations,
    ProvenanceNode, RecallQuery,
};
use foodblock_merge::{auto_merge, merge, FieldPolicies, MergeStrategy};
use foodblock_proof::{create_snapshot, selective_disclose, summarize, verify_proof, verify_snapshot, Disclosure};
use foodblock_store::{check_lines, BlockResolver, BlockStore, FsckIssue, InMemoryBlockStore};
use foodblock_types::BlockHash;

use crate::cli::*;
use crate::config::CliConfig;

/// Block content as written by hand: `hash` is optional and ignored.
#[derive(Deserialize)]
struct BlockInput {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    state: Map,
    #[serde(default)]
    refs: Refs,
}

struct Session {
    config: CliConfig,
    store_path: PathBuf,
    format: OutputFormat,
}

impl Session {
    /// Load the block file. It must exist.
    fn open_store(&self) -> anyhow::Result<InMemoryBlockStore> {
        InMemoryBlockStore::load(&self.store_path)
            .with_context(|| format!("loading {}", self.store_path.display()))
    }

    /// Load the block file, or start empty if it does not exist yet.
    fn open_or_create_store(&self) -> anyhow::Result<InMemoryBlockStore> {
        if self.store_path.exists() {
            self.open_store()
        } else {
            Ok(InMemoryBlockStore::new())
        }
    }

    fn save(&self, store: &InMemoryBlockStore) -> anyhow::Result<()> {
        store
            .save(&self.store_path)
            .with_context(|| format!("writing {}", self.store_path.display()))
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::resolve(cli.config.as_deref())?;
    let ctx = Session {
        store_path: config.store_path(cli.store.as_deref()),
        config,
        format: cli.format,
    };

    match cli.command {
        Command::Hash(args) => cmd_hash(&ctx, args),
        Command::Canonical(args) => cmd_canonical(&ctx, args),
        Command::Chain(args) => cmd_chain(&ctx, args),
        Command::Head(args) => cmd_head(&ctx, args),
        Command::Conflict(args) => cmd_conflict(&ctx, args),
        Command::Merge(args) => cmd_merge(&ctx, args),
        Command::AutoMerge(args) => cmd_auto_merge(&ctx, args),
        Command::Disclose(args) => cmd_disclose(&ctx, args),
        Command::VerifyProof(args) => cmd_verify_proof(&ctx, args),
        Command::Snapshot(args) => cmd_snapshot(&ctx, args),
        Command::VerifySnapshot(args) => cmd_verify_snapshot(&ctx, args),
        Command::Forward(args) => cmd_forward(&ctx, args),
        Command::Recall(args) => cmd_recall(&ctx, args),
        Command::Tree(args) => cmd_tree(&ctx, args),
        Command::Fsck(_) => cmd_fsck(&ctx),
    }
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {input}"))
    }
}

fn read_block_input(input: &str) -> anyhow::Result<BlockInput> {
    serde_json::from_str(&read_input(input)?).context("input is not a {type, state, refs} object")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn block_line(block: &Block) -> String {
    format!("{}  {}", block.hash().short_hex().yellow(), block.block_type().cyan())
}

fn resolve_required(store: &InMemoryBlockStore, hash: &BlockHash) -> anyhow::Result<Block> {
    match store.resolve(hash)? {
        Some(block) => Ok(block),
        None => bail!("block {} not found", hash),
    }
}

fn cmd_hash(ctx: &Session, args: HashArgs) -> anyhow::Result<()> {
    let input = read_block_input(&args.input.input)?;
    let block = Block::create(input.block_type, input.state, input.refs)?;
    if args.write {
        let store = ctx.open_or_create_store()?;
        store.put(block.clone())?;
        ctx.save(&store)?;
    }
    if ctx.json() {
        return print_json(&block);
    }
    println!("{}", block.hash());
    Ok(())
}

fn cmd_canonical(_ctx: &Session, args: InputArgs) -> anyhow::Result<()> {
    let input = read_block_input(&args.input)?;
    let text = canonical_string(&input.block_type, &input.state, &input.refs.to_map())?;
    println!("{text}");
    Ok(())
}

fn cmd_chain(ctx: &Session, args: ChainArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let depth = args.depth.unwrap_or(ctx.config.limits.chain);
    let blocks = chain(&args.hash, &store, depth)?;
    if ctx.json() {
        return print_json(&blocks);
    }
    if blocks.is_empty() {
        println!("Block {} not found.", args.hash.short_hex().yellow());
    }
    for (i, block) in blocks.iter().enumerate() {
        let marker = if i == 0 { "head".green().bold() } else { "    ".normal() };
        println!("{marker} {}", block_line(block));
    }
    Ok(())
}

fn cmd_head(ctx: &Session, args: HeadArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let policy = if args.any_author {
        AcceptancePolicy::any_author()
    } else {
        let blocks = store.blocks();
        AcceptancePolicy::with_delegations(Delegations::from_blocks(&blocks))
    };
    let depth = args.depth.unwrap_or(ctx.config.limits.head);
    let latest = head(&args.hash, &store, &policy, depth)?;
    if ctx.json() {
        return print_json(&serde_json::json!({ "head": latest }));
    }
    println!("{latest}");
    Ok(())
}

fn cmd_conflict(ctx: &Session, args: ConflictArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let depth = args.depth.unwrap_or(ctx.config.limits.conflict);
    let result = detect_conflict(&args.a, &args.b, &store, depth)?;
    if ctx.json() {
        return print_json(&result);
    }
    if result.is_conflict {
        println!("{} Heads have diverged.", "✗".red().bold());
    } else {
        println!("{} No conflict.", "✓".green().bold());
    }
    match result.common_ancestor {
        Some(ancestor) => println!("  Common ancestor: {}", ancestor.short_hex().yellow()),
        None => println!("  Common ancestor: {}", "none".dimmed()),
    }
    println!("  Chain A: {} block(s)", result.chain_a.len());
    for block in &result.chain_a {
        println!("    {}", block_line(block));
    }
    println!("  Chain B: {} block(s)", result.chain_b.len());
    for block in &result.chain_b {
        println!("    {}", block_line(block));
    }
    Ok(())
}

fn report_merge(ctx: &Session, store: &InMemoryBlockStore, block: Block, write: bool) -> anyhow::Result<()> {
    if write {
        store.put(block.clone())?;
        ctx.save(store)?;
    }
    if ctx.json() {
        return print_json(&block);
    }
    println!("{} Merge block {}", "✓".green().bold(), block.hash().to_string().yellow());
    if !write {
        println!("  {}", "not written (use --write)".dimmed());
    }
    Ok(())
}

fn cmd_merge(ctx: &Session, args: MergeArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let strategy: MergeStrategy = args.strategy.parse()?;
    let manual_state = match &args.state {
        Some(path) => {
            let text = read_input(&path.to_string_lossy())?;
            Some(serde_json::from_str::<Map>(&text).context("merge state must be a JSON object")?)
        }
        None => None,
    };
    let block = merge(&args.a, &args.b, &store, strategy, manual_state)?;
    report_merge(ctx, &store, block, args.write)
}

fn parse_policies(ctx: &Session, flags: &[String]) -> anyhow::Result<FieldPolicies> {
    let mut pairs: Vec<(&str, &str)> = ctx
        .config
        .merge
        .policies
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    for flag in flags {
        let Some(pair) = flag.split_once('=') else {
            bail!("policy {flag:?} is not FIELD=POLICY");
        };
        pairs.push(pair);
    }
    Ok(FieldPolicies::parse(pairs)?)
}

fn cmd_auto_merge(ctx: &Session, args: AutoMergeArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let policies = parse_policies(ctx, &args.policies)?;
    let block = auto_merge(&args.a, &args.b, &store, &policies)?;
    report_merge(ctx, &store, block, args.write)
}

fn cmd_disclose(ctx: &Session, args: DiscloseArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let block = resolve_required(&store, &args.hash)?;
    let fields: Vec<&str> = args.fields.iter().map(String::as_str).collect();
    let disclosure = selective_disclose(block.state(), &fields)?;
    // The disclosure is the artifact handed to a verifier, so it is always JSON.
    print_json(&disclosure)
}

fn cmd_verify_proof(ctx: &Session, args: InputArgs) -> anyhow::Result<()> {
    let disclosure: Disclosure =
        serde_json::from_str(&read_input(&args.input)?).context("input is not a disclosure")?;
    let valid = verify_proof(&disclosure.disclosed, &disclosure.proof, &disclosure.root);
    if ctx.json() {
        print_json(&serde_json::json!({ "valid": valid }))?;
    } else if valid {
        println!(
            "{} {} field(s) verified against {}",
            "✓".green().bold(),
            disclosure.disclosed.len(),
            disclosure.root.short_hex().yellow()
        );
    }
    if !valid {
        bail!("proof does not verify against {}", disclosure.root);
    }
    Ok(())
}

/// Blocks covered by a snapshot of the store: everything except snapshots.
fn snapshot_candidates(store: &InMemoryBlockStore) -> Vec<Block> {
    store
        .blocks()
        .into_iter()
        .filter(|b| b.block_type() != kinds::SNAPSHOT)
        .collect()
}

fn cmd_snapshot(ctx: &Session, args: SnapshotArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let blocks = snapshot_candidates(&store);
    let date_range = args.from.as_deref().zip(args.to.as_deref());
    let snapshot = create_snapshot(&blocks, args.summary.as_deref(), date_range)?;
    if args.write {
        store.put(snapshot.clone())?;
        ctx.save(&store)?;
    }
    if ctx.json() {
        return print_json(&serde_json::json!({
            "snapshot": snapshot,
            "summary": summarize(&blocks),
        }));
    }
    let summary = summarize(&blocks);
    println!("{} Snapshot {}", "✓".green().bold(), snapshot.hash().to_string().yellow());
    println!("  Blocks: {}", summary.total.to_string().bold());
    for (block_type, count) in &summary.by_type {
        println!("    {:>6}  {}", count, block_type.cyan());
    }
    Ok(())
}

fn cmd_verify_snapshot(ctx: &Session, args: VerifySnapshotArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let snapshot = resolve_required(&store, &args.hash)?;
    let blocks = snapshot_candidates(&store);
    let valid = verify_snapshot(&snapshot, &blocks);
    if ctx.json() {
        print_json(&serde_json::json!({ "valid": valid, "block_count": blocks.len() }))?;
    } else if valid {
        println!("{} Snapshot matches {} block(s)", "✓".green().bold(), blocks.len());
    }
    if !valid {
        bail!("snapshot {} does not match the store", args.hash);
    }
    Ok(())
}

fn cmd_forward(ctx: &Session, args: ForwardArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let refs = forward(&args.hash, &store)?;
    if ctx.json() {
        return print_json(&refs);
    }
    if refs.is_empty() {
        println!("No blocks reference {}.", args.hash.short_hex().yellow());
    }
    for r in &refs {
        println!("{:>10}  {}", r.role.bold(), block_line(&r.block));
    }
    Ok(())
}

fn cmd_recall(ctx: &Session, args: RecallArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let query = RecallQuery {
        max_depth: args.depth.unwrap_or(ctx.config.limits.recall),
        types: args.types,
        roles: args.roles,
    };
    let result = recall(&args.hash, &store, &query)?;
    if ctx.json() {
        return print_json(&result);
    }
    println!(
        "{} affected block(s), depth {}",
        result.affected.len().to_string().bold(),
        result.depth
    );
    for (block, path) in result.affected.iter().zip(&result.paths) {
        let indent = "  ".repeat(path.len().saturating_sub(1));
        println!("{indent}{}", block_line(block));
    }
    Ok(())
}

fn cmd_tree(ctx: &Session, args: TreeArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let depth = args.depth.unwrap_or(ctx.config.limits.tree);
    let Some(tree) = provenance_tree(&args.hash, &store, depth)? else {
        bail!("block {} not found", args.hash);
    };
    if ctx.json() {
        return print_json(&tree);
    }
    print_tree(&tree, None, 0);
    Ok(())
}

fn print_tree(node: &ProvenanceNode, role: Option<&str>, level: usize) {
    let indent = "  ".repeat(level);
    match role {
        Some(role) => println!("{indent}{} {}", role.bold(), block_line(&node.block)),
        None => println!("{}", block_line(&node.block)),
    }
    for (role, subtrees) in &node.ancestors {
        for subtree in subtrees {
            print_tree(subtree, Some(role.as_str()), level + 1);
        }
    }
}

fn cmd_fsck(ctx: &Session) -> anyhow::Result<()> {
    let file = std::fs::File::open(&ctx.store_path)
        .with_context(|| format!("opening {}", ctx.store_path.display()))?;
    let report = check_lines(file)?;
    if ctx.json() {
        print_json(&report)?;
    } else {
        print_fsck(&ctx.store_path, &report.issues, report.checked, report.valid);
    }
    if !report.is_clean() {
        bail!("{} integrity problem(s) found", report.issues.len());
    }
    Ok(())
}

fn print_fsck(path: &Path, issues: &[FsckIssue], checked: usize, valid: usize) {
    println!("Checked {} block(s) in {}: {} valid", checked, path.display(), valid);
    for issue in issues {
        match issue {
            FsckIssue::Malformed { line, reason } => {
                println!("  {} line {line}: malformed: {reason}", "✗".red())
            }
            FsckIssue::HashMismatch { line, stored, computed } => println!(
                "  {} line {line}: stored {} but content hashes to {}",
                "✗".red(),
                stored.short_hex(),
                computed.short_hex()
            ),
            FsckIssue::Uncanonical { line, reason } => {
                println!("  {} line {line}: {reason}", "✗".red())
            }
            FsckIssue::Dangling { block, role, target } => println!(
                "  {} {} refs.{role} -> {} not in file",
                "?".yellow(),
                block.short_hex(),
                target.short_hex()
            ),
        }
    }
    if issues.iter().all(|i| matches!(i, FsckIssue::Dangling { .. })) {
        println!("{} No integrity issues.", "✓".green().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodblock_merge::FieldPolicy;

    fn session(store_path: PathBuf, config: CliConfig) -> Session {
        Session {
            config,
            store_path,
            format: OutputFormat::Json,
        }
    }

    #[test]
    fn flag_policies_extend_config_policies() {
        let mut config = CliConfig::default();
        config.merge.policies.insert("price".into(), "max".into());
        let s = session("unused.jsonl".into(), config);
        let policies = parse_policies(&s, &["tags=union".to_string()]).unwrap();
        assert_eq!(policies.get("price"), FieldPolicy::Max);
        assert_eq!(policies.get("tags"), FieldPolicy::Union);
        assert!(parse_policies(&s, &["tags".to_string()]).is_err());
        assert!(parse_policies(&s, &["tags=average".to_string()]).is_err());
    }

    #[test]
    fn hash_write_then_chain_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("blocks.jsonl");
        let input = dir.path().join("bread.json");
        std::fs::write(
            &input,
            r#"{"type": "substance.product", "state": {"name": "Bread", "price": 4.5}}"#,
        )
        .unwrap();
        let s = session(store_path.clone(), CliConfig::default());

        cmd_hash(
            &s,
            HashArgs {
                input: InputArgs { input: input.to_string_lossy().into_owned() },
                write: true,
            },
        )
        .unwrap();
        let store = s.open_store().unwrap();
        assert_eq!(store.len(), 1);
        let hash = store.hashes()[0];

        cmd_chain(&s, ChainArgs { hash, depth: None }).unwrap();
        cmd_snapshot(
            &s,
            SnapshotArgs { summary: None, from: None, to: None, write: true },
        )
        .unwrap();

        let store = s.open_store().unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(snapshot_candidates(&store).len(), 1);
        let snapshot = store
            .blocks()
            .into_iter()
            .find(|b| b.block_type() == kinds::SNAPSHOT)
            .unwrap();
        cmd_verify_snapshot(&s, VerifySnapshotArgs { hash: *snapshot.hash() }).unwrap();
        cmd_fsck(&s).unwrap();
    }

    #[test]
    fn tree_uses_configured_depth() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("blocks.jsonl");
        let farm = Block::create("actor.producer", Map::new(), Refs::new()).unwrap();
        let wheat = Block::create(
            "substance.ingredient",
            Map::new(),
            Refs::new().with("source", farm.hash()),
        )
        .unwrap();
        InMemoryBlockStore::from_blocks([farm, wheat.clone()])
            .unwrap()
            .save(&store_path)
            .unwrap();

        let mut config = CliConfig::default();
        config.limits.tree = 0;
        let s = session(store_path.clone(), config);
        assert!(cmd_tree(&s, TreeArgs { hash: *wheat.hash(), depth: None }).is_err());
        assert!(cmd_tree(&s, TreeArgs { hash: *wheat.hash(), depth: Some(2) }).is_ok());

        let s = session(store_path, CliConfig::default());
        assert!(cmd_tree(&s, TreeArgs { hash: *wheat.hash(), depth: None }).is_ok());
    }

    #[test]
    fn missing_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path().join("absent.jsonl"), CliConfig::default());
        assert!(s.open_store().is_err());
        assert!(s.open_or_create_store().unwrap().is_empty());
    }
}
