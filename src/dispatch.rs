//! Request dispatcher (spec.md C6, §4.6).
//!
//! A [`CommandTable`] is built once at startup from the data-kind command
//! modules in [`crate::commands`], each entry declaring a `readonly` flag;
//! the *write-command set* (spec.md §9 REDESIGN FLAGS: "re-architect as an
//! explicit registry value constructed at startup... the write-command set
//! is then a field derived from it") is simply every non-readonly entry.
//!
//! [`Router`] implements dispatch steps 3-4: a write command is hand off to
//! the per-DB [`WriteExecutor`] (a bounded queue plus a single consumer
//! task, serializing every write on one logical DB per spec.md §5's
//! ordering guarantee); a readonly command runs straight on the caller.
//! Steps 1-2 (transaction handler, `QUIT`) and the connection-scoped
//! control commands (`SELECT`/`BEGIN`/`COMMIT`/`ROLLBACK`/`SLAVEOF`/
//! `FULLSYNC`/`SYNC`/`FLUSHALL`/`DBSIZE`/`INFO`/`PING`/`ECHO`) live in
//! [`crate::server::connection`], which owns the per-connection state
//! (selected DB, transaction context, socket) these commands need and that
//! a per-DB-scoped [`crate::db::LogicalDb`] handler cannot reach.

use crate::commands::{bitmap, expiration, hash, list, string, zset};
use crate::db::LogicalDb;
use crate::persistence::Aof;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::protocol::RespValue;

type BoxFuture<'a> = Pin<Box<dyn Future<Output = RespValue> + Send + 'a>>;

/// A command handler, uniform across every data-kind module: bound to one
/// logical DB, given the raw argument vector (command name already
/// stripped), returns one reply.
pub type HandlerFn = for<'a> fn(&'a Arc<LogicalDb>, &'a [Vec<u8>]) -> BoxFuture<'a>;

pub struct CommandEntry {
    pub readonly: bool,
    pub handler: HandlerFn,
}

/// Wraps an `async fn(&Arc<LogicalDb>, &[Vec<u8>]) -> RespValue` into a
/// plain [`HandlerFn`] pointer by generating a small non-async trampoline —
/// async fn items each have a distinct anonymous type, so they cannot be
/// stored as `fn` pointers directly without this.
macro_rules! handler {
    ($f:path) => {{
        fn trampoline<'a>(db: &'a Arc<LogicalDb>, args: &'a [Vec<u8>]) -> BoxFuture<'a> {
            Box::pin($f(db, args))
        }
        trampoline as HandlerFn
    }};
}

/// The full command table: name (lower-case) -> entry. Computed once at
/// boot (spec.md §4.6: "computed once at boot from the full command
/// table"); immutable thereafter.
pub struct CommandTable {
    entries: HashMap<&'static str, CommandEntry>,
    write_commands: HashSet<&'static str>,
}

impl CommandTable {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        let mut write_commands = HashSet::new();

        let mut add = |name: &'static str, readonly: bool, handler: HandlerFn| {
            if !readonly {
                write_commands.insert(name);
            }
            entries.insert(name, CommandEntry { readonly, handler });
        };

        add("get", true, handler!(string::get));
        add("set", false, handler!(string::set));
        add("del", false, handler!(string::del));

        add("lpush", false, handler!(list::lpush));
        add("rpush", false, handler!(list::rpush));
        add("lpop", false, handler!(list::lpop));
        add("rpop", false, handler!(list::rpop));
        add("llen", true, handler!(list::llen));
        add("lrange", true, handler!(list::lrange));

        add("hset", false, handler!(hash::hset));
        add("hget", true, handler!(hash::hget));
        add("hdel", false, handler!(hash::hdel));
        add("hlen", true, handler!(hash::hlen));

        add("zadd", false, handler!(zset::zadd));
        add("zscore", true, handler!(zset::zscore));
        add("zcard", true, handler!(zset::zcard));
        add("zrem", false, handler!(zset::zrem));
        add("zincrby", false, handler!(zset::zincrby));

        add("bget", true, handler!(bitmap::bget));
        add("bsetbit", false, handler!(bitmap::bsetbit));
        add("bmsetbit", false, handler!(bitmap::bmsetbit));
        add("bcount", true, handler!(bitmap::bcount));
        add("bopt", false, handler!(bitmap::bopt));

        macro_rules! expiry_family {
            ($expire:ident, $pexpire:ident, $expireat:ident, $pexpireat:ident, $ttl:ident, $pttl:ident, $persist:ident) => {
                add(stringify!($expire), false, handler!(expiration::$expire));
                add(stringify!($pexpire), false, handler!(expiration::$pexpire));
                add(stringify!($expireat), false, handler!(expiration::$expireat));
                add(stringify!($pexpireat), false, handler!(expiration::$pexpireat));
                add(stringify!($ttl), true, handler!(expiration::$ttl));
                add(stringify!($pttl), true, handler!(expiration::$pttl));
                add(stringify!($persist), false, handler!(expiration::$persist));
            };
        }
        expiry_family!(expire, pexpire, expireat, pexpireat, ttl, pttl, persist);
        expiry_family!(lexpire, lpexpire, lexpireat, lpexpireat, lttl, lpttl, lpersist);
        expiry_family!(hexpire, hpexpire, hexpireat, hpexpireat, httl, hpttl, hpersist);
        expiry_family!(zexpire, zpexpire, zexpireat, zpexpireat, zttl, zpttl, zpersist);
        expiry_family!(bexpire, bpexpire, bexpireat, bpexpireat, bttl, bpttl, bpersist);

        Self { entries, write_commands }
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    /// spec.md §4.6: "every non-readonly command name lower-cased".
    pub fn is_write_command(&self, name: &str) -> bool {
        self.write_commands.contains(name)
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncates a reconstructed command line to 256 bytes for the access log
/// (SPEC_FULL.md §B: "the `(remoteAddr, duration_ms, truncated_full_command,
/// err)` tuple... written through a dedicated `tracing` target").
fn truncated_command_line(name: &str, args: &[Vec<u8>]) -> String {
    let mut line = name.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&String::from_utf8_lossy(arg));
    }
    if line.len() > 256 {
        line.truncate(256);
    }
    line
}

/// Rebuilds a full command line for AOF emission: `name arg1 arg2 ...`,
/// space-joined (spec.md §3: segment payload is `dbIndex | fullCommandBytes`
/// with no further framing specified for the command bytes themselves).
pub(crate) fn command_line(name: &str, args: &[Vec<u8>]) -> Vec<u8> {
    let mut line = name.as_bytes().to_vec();
    for arg in args {
        line.push(b' ');
        line.extend_from_slice(arg);
    }
    line
}

/// Executes one command against `db`: lookup, invoke, access-log. Shared by
/// both the per-DB write executor and the connection's own synchronous
/// executor, since spec.md §4.6 describes one execution procedure used
/// from either path.
pub async fn execute(table: &CommandTable, db: &Arc<LogicalDb>, remote_addr: &str, name: &str, args: &[Vec<u8>]) -> RespValue {
    let start = Instant::now();
    let reply = match table.lookup(name) {
        Some(entry) => (entry.handler)(db, args).await,
        None => RespValue::Error(format!("ERR unknown command '{}'", name)),
    };
    let elapsed_ms = start.elapsed().as_millis();
    let err = matches!(&reply, RespValue::Error(_));
    info!(
        target: "ledis_engine::access",
        remote_addr,
        duration_ms = elapsed_ms,
        command = %truncated_command_line(name, args),
        err,
        "command executed"
    );
    reply
}

struct WriteRequest {
    name: String,
    args: Vec<Vec<u8>>,
    remote_addr: String,
    reply: oneshot::Sender<RespValue>,
}

/// A single logical DB's serialized write queue (spec.md §4.6: "a
/// goroutine-like worker created one per logical DB at startup... owns a
/// bounded request queue (default capacity 32)").
pub struct WriteExecutor {
    sender: mpsc::Sender<WriteRequest>,
}

impl WriteExecutor {
    /// `aof` is appended to from inside this task's own loop, right after
    /// `execute()` computes the reply and before the reply is sent back —
    /// never from the connection task. Since this loop is this DB's single
    /// consumer, that keeps AOF record order identical to commit order even
    /// when multiple connections are writing to the same DB concurrently;
    /// appending from the connection task instead (after `route()` returns)
    /// would let two such connections race into the AOF in the opposite
    /// order from the one their commits actually landed in.
    pub fn spawn(db: Arc<LogicalDb>, table: Arc<CommandTable>, aof: Arc<Aof>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<WriteRequest>(capacity);
        tokio::spawn(async move {
            while let Some(req) = rx.recv().await {
                let reply = execute(&table, &db, &req.remote_addr, &req.name, &req.args).await;
                if !matches!(reply, RespValue::Error(_)) {
                    let line = command_line(&req.name, &req.args);
                    if let Err(e) = aof.append(db.index, &[line]).await {
                        warn!("aof append failed: {}", e);
                    }
                }
                let _ = req.reply.send(reply);
            }
        });
        Self { sender: tx }
    }

    /// Enqueue a write command and block for its reply, matching spec.md
    /// §4.6: "`handle(req)` enqueues the request and blocks on a reply
    /// channel stored in the request."
    pub async fn handle(&self, remote_addr: &str, name: String, args: Vec<Vec<u8>>) -> RespValue {
        let (reply_tx, reply_rx) = oneshot::channel();
        let req = WriteRequest {
            name,
            args,
            remote_addr: remote_addr.to_string(),
            reply: reply_tx,
        };
        if self.sender.send(req).await.is_err() {
            return RespValue::Error("ERR write executor unavailable".to_string());
        }
        reply_rx
            .await
            .unwrap_or_else(|_| RespValue::Error("ERR write executor closed without a reply".to_string()))
    }
}

/// Owns the shared [`CommandTable`] and one [`WriteExecutor`] per logical
/// DB, and implements dispatch routing steps 3-4 of spec.md §4.6 (steps 1-2
/// — transaction handler and `QUIT` — are the connection's responsibility,
/// since they need state this router doesn't have).
pub struct Router {
    table: Arc<CommandTable>,
    write_executors: Vec<WriteExecutor>,
}

impl Router {
    pub fn new(dbs: &crate::db::DbBank, aof: Arc<Aof>, write_queue_capacity: usize) -> Self {
        let table = Arc::new(CommandTable::new());
        let write_executors = dbs
            .iter()
            .map(|db| WriteExecutor::spawn(Arc::clone(db), Arc::clone(&table), Arc::clone(&aof), write_queue_capacity))
            .collect();
        Self { table, write_executors }
    }

    pub fn table(&self) -> &Arc<CommandTable> {
        &self.table
    }

    /// Route one already-lower-cased command name. `db` is the connection's
    /// currently selected logical DB (steps 3 and 4 both execute against
    /// it, just on different tasks).
    pub async fn route(&self, db: &Arc<LogicalDb>, remote_addr: &str, name: &str, args: Vec<Vec<u8>>) -> RespValue {
        if self.table.is_write_command(name) {
            self.write_executors[db.index as usize]
                .handle(remote_addr, name.to_string(), args)
                .await
        } else {
            execute(&self.table, db, remote_addr, name, &args).await
        }
    }
}
