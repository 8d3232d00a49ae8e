//! Per-connection state and request processing (spec.md C7, §4.6/§4.7).
//!
//! Grounded on the teacher's `server::connection::Connection` read loop
//! (buffered socket, `RespParser::check_complete`/`parse`, response
//! serialization) generalized to spec.md's routing decision: transaction
//! handler first, then the fixed set of connection-scoped control commands,
//! then [`crate::dispatch::Router`] for everything else.

use crate::commands::server_cmds::{self, ReplicationState};
use crate::config::DynamicConfig;
use crate::db::DbBank;
use crate::dispatch::{command_line, Router};
use crate::persistence::Aof;
use crate::protocol::{RespParser, RespSerializer, RespValue};
use crate::server::client_info::ClientRegistry;
use crate::store::ByteStore;
use crate::transaction::{self, TransactionContext};
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
    client_id: u64,
    remote_addr: String,
    store: Arc<dyn ByteStore>,
    bank: Arc<DbBank>,
    router: Arc<Router>,
    aof: Arc<Aof>,
    replication: Arc<ReplicationState>,
    client_registry: Arc<ClientRegistry>,
    dump_lock: Arc<RwLock<()>>,
    max_sync_records: usize,
    dynamic_config: Arc<DynamicConfig>,
    /// spec.md §4.7: "defaults to DB 0; updated by SELECT".
    db_index: u8,
    /// `None` outside a transaction; spec.md §9 prefers this to the
    /// null-pointer-handle overload the source uses.
    tx: Option<TransactionContext>,
}

impl Connection {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        socket: TcpStream,
        remote_addr: String,
        store: Arc<dyn ByteStore>,
        bank: Arc<DbBank>,
        router: Arc<Router>,
        aof: Arc<Aof>,
        replication: Arc<ReplicationState>,
        client_registry: Arc<ClientRegistry>,
        dump_lock: Arc<RwLock<()>>,
        max_sync_records: usize,
        dynamic_config: Arc<DynamicConfig>,
    ) -> Self {
        let client_id = client_registry.register(remote_addr.clone(), 0);
        Self {
            stream: BufWriter::new(socket),
            buffer: BytesMut::with_capacity(4096),
            client_id,
            remote_addr,
            store,
            bank,
            router,
            aof,
            replication,
            client_registry,
            dump_lock,
            max_sync_records,
            dynamic_config,
            db_index: 0,
            tx: None,
        }
    }

    fn current_db(&self) -> Arc<crate::db::LogicalDb> {
        if let Some(tx) = &self.tx {
            Arc::clone(tx.db())
        } else {
            self.bank.get(self.db_index)
        }
    }

    async fn write_reply(&mut self, value: &RespValue) -> anyhow::Result<()> {
        let bytes = RespSerializer::serialize(value);
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read, parse, and dispatch requests until the client disconnects or
    /// issues `QUIT`. On return (any path) the transaction context, if any,
    /// is dropped — rolling back a pending store transaction per spec.md
    /// §4.7: "On close: if a transaction is in progress, reset it."
    pub async fn process(&mut self) -> anyhow::Result<()> {
        let result = self.process_inner().await;
        self.client_registry.unregister(self.client_id);
        result
    }

    async fn process_inner(&mut self) -> anyhow::Result<()> {
        loop {
            let frame_len = loop {
                if let Some(len) = RespParser::check_complete(&self.buffer)? {
                    break len;
                }
                let mut chunk = [0u8; 4096];
                let n = self.stream.get_mut().read(&mut chunk).await?;
                if n == 0 {
                    return Ok(());
                }
                self.buffer.extend_from_slice(&chunk[..n]);
            };

            let frame = self.buffer.split_to(frame_len);
            let request = match RespParser::parse(&frame) {
                Ok(v) => v,
                Err(e) => {
                    self.write_reply(&RespValue::Error(format!("ERR protocol error: {}", e))).await?;
                    continue;
                }
            };

            let Some(items) = request.as_array() else {
                self.write_reply(&RespValue::Error("ERR expected array request".to_string())).await?;
                continue;
            };
            if items.is_empty() {
                self.write_reply(&RespValue::Error("ERR empty command".to_string())).await?;
                continue;
            }

            let mut parts: Vec<Vec<u8>> = Vec::with_capacity(items.len());
            let mut malformed = false;
            for item in items {
                match item.as_bulk_string() {
                    Some(b) => parts.push(b.to_vec()),
                    None => {
                        malformed = true;
                        break;
                    }
                }
            }
            if malformed {
                self.write_reply(&RespValue::Error("ERR expected bulk string elements".to_string())).await?;
                continue;
            }

            let name = String::from_utf8_lossy(&parts[0]).to_ascii_lowercase();
            let args = parts.split_off(1);

            self.client_registry.mark_activity(self.client_id, name.clone(), self.db_index as usize);

            if name == "quit" {
                self.write_reply(&RespValue::SimpleString("OK".to_string())).await?;
                return Ok(());
            }

            let reply = self.dispatch(&name, args).await;
            self.write_reply(&reply).await?;
        }
    }

    /// spec.md §4.6 routing decision, steps 1 and 3-4 (step 2, `quit`, is
    /// handled by the caller since it needs to end the loop).
    async fn dispatch(&mut self, name: &str, args: Vec<Vec<u8>>) -> RespValue {
        if self.tx.is_some() {
            return self.dispatch_in_transaction(name, args).await;
        }

        match name {
            "select" => self.cmd_select(&args).await,
            "begin" => self.cmd_begin().await,
            "commit" | "rollback" => RespValue::Error("ERR no transaction in progress".to_string()),
            "ping" => server_cmds::ping(&args),
            "echo" => server_cmds::echo(&args),
            "slaveof" => server_cmds::slaveof(&self.replication, &args).await,
            "fullsync" => server_cmds::fullsync(self.store.as_ref(), &self.aof, &self.dump_lock).await,
            "sync" => server_cmds::sync(&self.aof, &args, self.max_sync_records).await,
            "flushall" => server_cmds::flushall(&self.bank).await,
            "dbsize" => server_cmds::dbsize(&self.current_db()),
            "info" => server_cmds::info(&self.bank),
            "config" => server_cmds::config(&self.dynamic_config, &args),
            _ => self.dispatch_via_router(name, args).await,
        }
    }

    /// Writes are appended to the AOF from inside the per-DB
    /// [`crate::dispatch::WriteExecutor`] task itself, not here — see that
    /// module for why (single-writer discipline, spec.md §4.1/§4.6).
    async fn dispatch_via_router(&mut self, name: &str, args: Vec<Vec<u8>>) -> RespValue {
        let db = self.current_db();
        self.router.route(&db, &self.remote_addr, name, args).await
    }

    /// spec.md §4.4: "the connection's dispatcher routes the request to a
    /// transaction handler rather than the per-DB write executor."
    async fn dispatch_in_transaction(&mut self, name: &str, args: Vec<Vec<u8>>) -> RespValue {
        if transaction::is_denied(name) {
            return RespValue::Error("ERR invalid operation in transaction".to_string());
        }

        match name {
            "begin" => RespValue::Error("ERR nest transaction not supported".to_string()),
            "commit" => self.cmd_commit().await,
            "rollback" => self.cmd_rollback().await,
            _ => {
                let table = Arc::clone(self.router.table());
                let db = self.current_db();
                let reply = crate::dispatch::execute(&table, &db, &self.remote_addr, name, &args).await;
                if table.is_write_command(name) && !matches!(reply, RespValue::Error(_)) {
                    self.tx.as_mut().unwrap().record(name, &args);
                }
                reply
            }
        }
    }

    async fn cmd_select(&mut self, args: &[Vec<u8>]) -> RespValue {
        if args.len() != 1 {
            return RespValue::Error("ERR wrong number of arguments for 'select'".to_string());
        }
        let Some(n) = std::str::from_utf8(&args[0]).ok().and_then(|s| s.parse::<i64>().ok()) else {
            return RespValue::Error("ERR value is not an integer or out of range".to_string());
        };
        if n < 0 || n as usize >= self.bank.len() {
            return RespValue::Error("ERR DB index is out of range".to_string());
        }
        self.db_index = n as u8;
        RespValue::SimpleString("OK".to_string())
    }

    async fn cmd_begin(&mut self) -> RespValue {
        let db = self.bank.get(self.db_index);
        match TransactionContext::begin(&db).await {
            Ok(ctx) => {
                self.tx = Some(ctx);
                RespValue::SimpleString("OK".to_string())
            }
            Err(e) => RespValue::Error(format!("ERR {}", e)),
        }
    }

    /// `ctx` is kept alive (and so keeps holding the DB's exclusive
    /// write-lock) across the AOF append below, not just across
    /// `ctx.commit()` — otherwise a queued write on this DB could acquire
    /// the lock, commit, and append to the AOF in the gap between this
    /// transaction's store commit and its own AOF append, reordering the
    /// AOF relative to commit order.
    async fn cmd_commit(&mut self) -> RespValue {
        let mut ctx = self.tx.take().unwrap();
        match ctx.commit() {
            Ok(actions) => {
                let lines: Vec<Vec<u8>> = actions.iter().map(|a| command_line(&a.command, &a.args)).collect();
                if !lines.is_empty() {
                    if let Err(e) = self.aof.append(self.db_index, &lines).await {
                        warn!("aof append for transaction commit failed: {}", e);
                    }
                }
                debug!("transaction committed on db {}", self.db_index);
                RespValue::SimpleString("OK".to_string())
            }
            Err(e) => RespValue::Error(format!("ERR {}", e)),
        }
    }

    async fn cmd_rollback(&mut self) -> RespValue {
        let ctx = self.tx.take().unwrap();
        match ctx.rollback() {
            Ok(()) => RespValue::SimpleString("OK".to_string()),
            Err(e) => RespValue::Error(format!("ERR {}", e)),
        }
    }
}
