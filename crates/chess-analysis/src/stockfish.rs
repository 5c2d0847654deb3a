//! Stockfish engine wrapper using UCI protocol (async I/O)

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::{timeout_at, Instant};

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::{Engine, PvLine, Score, SearchResult};
use crate::error::AnalysisError;

/// Grace period for `bestmove` after a `stop`
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Stockfish engine instance
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    multipv: u32,
    search_timeout: Duration,
    stop_grace: Duration,
    /// Bytes of a line whose read was cut short by a timeout
    pending: Vec<u8>,
    /// Set when a search was abandoned and its output may still arrive
    stale: bool,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(config: &EngineConfig) -> Result<Self, AnalysisError> {
        let mut process = Command::new(&config.stockfish_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AnalysisError::Stockfish(format!(
                    "Failed to spawn Stockfish at '{}': {e}",
                    config.stockfish_path
                ))
            })?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| AnalysisError::Stockfish("Stockfish stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| AnalysisError::Stockfish("Stockfish stdout unavailable".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            multipv: 1,
            search_timeout: config.search_timeout,
            stop_grace: STOP_GRACE,
            pending: Vec::new(),
            stale: false,
        };

        // Initialize UCI
        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        // Configure for analysis
        engine
            .send(&format!("setoption name Threads value {}", config.threads))
            .await?;
        engine
            .send(&format!("setoption name Hash value {}", config.hash_mb))
            .await?;
        engine
            .send(&format!(
                "setoption name Move Overhead value {}",
                config.move_overhead_ms
            ))
            .await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        info!(
            path = %config.stockfish_path,
            threads = config.threads,
            hash_mb = config.hash_mb,
            "Stockfish ready"
        );

        Ok(engine)
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), AnalysisError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| AnalysisError::Stockfish(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| AnalysisError::Stockfish(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Read one trimmed line; EOF means the process is gone.
    /// Partial input survives a cancelled read and is completed by the next call.
    async fn read_line(&mut self) -> Result<String, AnalysisError> {
        let n = self
            .stdout
            .read_until(b'\n', &mut self.pending)
            .await
            .map_err(|e| AnalysisError::Stockfish(format!("Failed to read from Stockfish: {e}")))?;
        if n == 0 {
            return Err(AnalysisError::Stockfish("engine exited".into()));
        }
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        Ok(line)
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), AnalysisError> {
        loop {
            let line = self.read_line().await?;
            debug!(line = %line, "SF >");
            if line == expected {
                return Ok(());
            }
        }
    }

    /// Discard the output of an abandoned search.
    /// The process is killed if it does not answer `isready` in time.
    async fn resync(&mut self) -> Result<(), AnalysisError> {
        self.send("isready").await?;
        let deadline = Instant::now() + self.search_timeout;
        loop {
            match timeout_at(deadline, self.read_line()).await {
                Ok(Ok(line)) if line == "readyok" => break,
                Ok(Ok(line)) => debug!(line = %line, "SF > discarded"),
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!("Stockfish unresponsive after stop, killing it");
                    let _ = self.process.start_kill();
                    return Err(AnalysisError::Stockfish("engine unresponsive after stop".into()));
                }
            }
        }
        self.stale = false;
        Ok(())
    }

    async fn set_multipv(&mut self, multipv: u32) -> Result<(), AnalysisError> {
        if self.multipv != multipv {
            self.send(&format!("setoption name MultiPV value {multipv}"))
                .await?;
            self.multipv = multipv;
        }
        Ok(())
    }

    /// Search to a fixed depth, collecting the latest info line per multipv slot
    async fn search_depth(
        &mut self,
        fen: &str,
        depth: u32,
        multipv: u32,
    ) -> Result<SearchResult, AnalysisError> {
        let multipv = multipv.max(1);
        if self.stale {
            self.resync().await?;
        }
        self.set_multipv(multipv).await?;
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let mut slots: Vec<Option<PvLine>> = vec![None; multipv as usize];
        let mut deadline = Instant::now() + self.search_timeout;
        let mut stopped = false;

        let best_move = loop {
            let line = match timeout_at(deadline, self.read_line()).await {
                Ok(read) => read?,
                Err(_) if !stopped => {
                    warn!(fen, depth, "Search timed out, sending stop");
                    self.send("stop").await?;
                    stopped = true;
                    deadline = Instant::now() + self.stop_grace;
                    continue;
                }
                Err(_) => {
                    self.stale = true;
                    return Err(AnalysisError::Stockfish("no bestmove after stop".into()));
                }
            };
            let trimmed = line.as_str();

            if trimmed.starts_with("info") && trimmed.contains(" pv ") {
                if let Some(pv_line) = parse_info_line(trimmed) {
                    let idx = pv_line.multipv.saturating_sub(1) as usize;
                    if idx < slots.len() {
                        slots[idx] = Some(pv_line);
                    }
                }
            } else if trimmed.starts_with("bestmove") {
                debug!(line = trimmed, "SF >");
                break parse_bestmove(trimmed);
            }
        };

        Ok(SearchResult {
            lines: slots.into_iter().flatten().collect(),
            best_move,
        })
    }
}

impl Engine for StockfishEngine {
    async fn search(
        &mut self,
        fen: &str,
        depth: u32,
        multipv: u32,
    ) -> Result<SearchResult, AnalysisError> {
        self.search_depth(fen, depth, multipv).await
    }

    /// Send quit command and wait for process to exit
    async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        let _ = self.process.start_kill();
    }
}

/// Value following `key` in a whitespace-separated info line
fn parse_after<T: std::str::FromStr>(line: &str, key: &str) -> Option<T> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == key && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    parse_after(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    parse_after(line, "mate")
}

/// Parse multipv index from info line
fn parse_multipv_index(line: &str) -> Option<u32> {
    parse_after(line, "multipv")
}

fn parse_depth(line: &str) -> Option<u32> {
    parse_after(line, "depth")
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut in_pv = false;
    let mut moves = Vec::new();

    for part in parts {
        if part == "pv" {
            in_pv = true;
            continue;
        }
        if in_pv {
            // PV ends at next keyword or end of line
            if part.starts_with("bmc") || part == "string" {
                break;
            }
            moves.push(part.to_string());
        }
    }

    moves
}

/// Build a line from an `info ... score ... pv ...` record.
/// Bound scores (`lowerbound`/`upperbound`) are skipped.
fn parse_info_line(line: &str) -> Option<PvLine> {
    if line.contains("lowerbound") || line.contains("upperbound") {
        return None;
    }
    let score = match (parse_mate(line), parse_cp(line)) {
        (Some(mate), _) => Score::Mate(mate),
        (None, Some(cp)) => Score::Cp(cp),
        (None, None) => return None,
    };
    let pv = parse_pv(line);
    if pv.is_empty() {
        return None;
    }
    Some(PvLine {
        multipv: parse_multipv_index(line).unwrap_or(1),
        depth: parse_depth(line).unwrap_or(0),
        score,
        pv,
    })
}

fn parse_bestmove(line: &str) -> Option<String> {
    line.split_whitespace()
        .nth(1)
        .filter(|mv| *mv != "(none)")
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cp() {
        let line = "info depth 20 seldepth 25 multipv 1 score cp 35 nodes 100000 pv e2e4";
        assert_eq!(parse_cp(line), Some(35));
    }

    #[test]
    fn test_parse_mate() {
        let line = "info depth 20 score mate 3 nodes 100000 pv e2e4";
        assert_eq!(parse_mate(line), Some(3));
    }

    #[test]
    fn test_parse_pv() {
        let line = "info depth 20 score cp 35 pv e2e4 e7e5 g1f3";
        let pv = parse_pv(line);
        assert_eq!(pv, vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn test_parse_info_line() {
        let line = "info depth 18 seldepth 24 multipv 2 score cp -12 nodes 9000 nps 1 tbhits 0 time 5 pv d2d4 d7d5";
        let parsed = parse_info_line(line).unwrap();
        assert_eq!(parsed.multipv, 2);
        assert_eq!(parsed.depth, 18);
        assert_eq!(parsed.score, Score::Cp(-12));
        assert_eq!(parsed.pv, vec!["d2d4", "d7d5"]);

        let mate = parse_info_line("info depth 5 multipv 1 score mate -2 pv e8d8").unwrap();
        assert_eq!(mate.score, Score::Mate(-2));

        assert!(parse_info_line("info depth 10 score cp 20 lowerbound pv e2e4").is_none());
        assert!(parse_info_line("info depth 0 score mate 0").is_none());
    }

    #[test]
    fn test_parse_bestmove() {
        assert_eq!(
            parse_bestmove("bestmove e2e4 ponder e7e5").as_deref(),
            Some("e2e4")
        );
        assert_eq!(parse_bestmove("bestmove (none)"), None);
    }

    #[cfg(unix)]
    mod process {
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        use tempfile::{tempdir, TempDir};

        use super::*;

        const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        const STALEMATE: &str = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1";

        /// Write a shell script speaking just enough UCI, with `go_body` answering `go`.
        /// Every command received is appended to `commands.log` next to it.
        fn fake_engine(dir: &TempDir, go_body: &str) -> EngineConfig {
            let path = dir.path().join("fake-stockfish");
            let log = dir.path().join("commands.log");
            let script = format!(
                r#"#!/bin/sh
fen=""
while IFS= read -r line; do
  echo "$line" >> "{log}"
  case "$line" in
    uci) echo "id name Fake"; echo "uciok" ;;
    isready) echo "readyok" ;;
    "position fen "*) fen="${{line#position fen }}" ;;
    "go "*)
{go_body}
      ;;
    quit) exit 0 ;;
  esac
done
"#,
                log = log.display()
            );
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

            EngineConfig {
                stockfish_path: path.display().to_string(),
                threads: 1,
                hash_mb: 16,
                move_overhead_ms: 10,
                search_timeout: Duration::from_secs(1),
            }
        }

        fn commands(dir: &Path) -> Vec<String> {
            std::fs::read_to_string(dir.join("commands.log"))
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }

        const TWO_LINES: &str = r#"      case "$fen" in
        7k/5Q2*) echo "bestmove (none)" ;;
        *) echo "info depth 12 seldepth 15 multipv 1 score cp 25 nodes 10 pv e2e4 e7e5"
           echo "info depth 12 seldepth 14 multipv 2 score cp 10 nodes 10 pv d2d4"
           echo "bestmove e2e4 ponder e7e5" ;;
      esac"#;

        #[tokio::test]
        async fn test_handshake_and_multipv_search() {
            let dir = tempdir().unwrap();
            let mut engine = StockfishEngine::new(&fake_engine(&dir, TWO_LINES))
                .await
                .unwrap();

            let result = engine.search(START, 12, 2).await.unwrap();
            assert_eq!(result.best_move.as_deref(), Some("e2e4"));
            assert_eq!(result.lines.len(), 2);
            assert_eq!(result.lines[0].score, Score::Cp(25));
            assert_eq!(result.lines[1].pv, vec!["d2d4"]);

            engine.search(START, 12, 2).await.unwrap();
            engine.search(START, 12, 1).await.unwrap();
            engine.quit().await;

            let log = commands(dir.path());
            assert!(log.contains(&"setoption name Threads value 1".to_string()));
            assert!(log.contains(&"setoption name Move Overhead value 10".to_string()));
            let multipv: Vec<&String> = log.iter().filter(|c| c.contains("MultiPV")).collect();
            assert_eq!(
                multipv,
                vec!["setoption name MultiPV value 2", "setoption name MultiPV value 1"],
                "MultiPV is only resent when it changes"
            );
        }

        #[tokio::test]
        async fn test_no_legal_moves_gives_no_best_move() {
            let dir = tempdir().unwrap();
            let mut engine = StockfishEngine::new(&fake_engine(&dir, TWO_LINES))
                .await
                .unwrap();

            let result = engine.search(STALEMATE, 10, 1).await.unwrap();
            assert_eq!(result.best_move, None);
            assert!(result.lines.is_empty());
        }

        #[tokio::test]
        async fn test_engine_exit_is_an_error() {
            let dir = tempdir().unwrap();
            let mut engine = StockfishEngine::new(&fake_engine(&dir, "      exit 0"))
                .await
                .unwrap();

            let err = engine.search(START, 10, 1).await.unwrap_err();
            assert!(err.to_string().contains("engine exited"), "got: {err}");
        }

        #[tokio::test]
        async fn test_missing_binary_fails_to_spawn() {
            let config = EngineConfig::default().with_path("/nonexistent/stockfish");
            let err = StockfishEngine::new(&config).await.err().unwrap();
            assert!(err.to_string().contains("Failed to spawn Stockfish"));
        }

        #[tokio::test]
        async fn test_late_output_of_abandoned_search_is_discarded() {
            // The first search answers only long after `stop`.
            let go = r#"      case "$fen" in
        *" w KQkq "*) sleep 1.5
           echo "info depth 30 multipv 1 score cp 999 pv a2a3"
           echo "bestmove a2a3" ;;
        *) echo "info depth 10 multipv 1 score cp -30 pv e7e5"
           echo "bestmove e7e5" ;;
      esac"#;
            let dir = tempdir().unwrap();
            let mut engine = StockfishEngine::new(&fake_engine(&dir, go)).await.unwrap();
            engine.stop_grace = Duration::from_millis(200);

            let err = engine.search(START, 30, 1).await.unwrap_err();
            assert!(err.to_string().contains("no bestmove after stop"), "got: {err}");

            let result = engine.search(AFTER_E4, 10, 1).await.unwrap();
            assert_eq!(result.best_move.as_deref(), Some("e7e5"));
            assert_eq!(result.lines[0].score, Score::Cp(-30));
            assert_eq!(result.lines[0].pv, vec!["e7e5"]);

            let log = commands(dir.path());
            let stop = log.iter().position(|c| c == "stop").unwrap();
            let second = log.iter().rposition(|c| c.starts_with("position fen")).unwrap();
            assert!(
                log[stop..second].iter().any(|c| c == "isready"),
                "resync happens before the next position"
            );
        }
    }
}
