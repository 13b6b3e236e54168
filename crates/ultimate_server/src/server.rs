//! WebSocket game server: matchmaking intake, match start, command routing.

use crate::command::{Command, HELP_TEXT};
use crate::config::ServerConfig;
use crate::connection::ClientHandle;
use crate::ids::generate_player_id;
use crate::matchmaking::{
    FifoMatchmaker, GameMatch, MatchError, MatchHandler, MatchMode, MatchScheduler,
    PlayerRequest,
};
use crate::messages::{
    DrawOfferPayload, GameOverPayload, MovePayload, ServerMessage, WelcomePayload,
};
use crate::recorder::UgnRecorder;
use crate::registry::GameRegistry;
use crate::session::{GameResult, GameSession, Player, PlayerId};
use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Query, State};
use axum::response::Response;
use axum::routing::get;
use dashmap::DashSet;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::future::Future;
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use ultimate_board::Move;

/// Plain-text page served at `/`.
pub const INDEX_TEXT: &str = "Ultimate Tic-Tac-Toe WebSocket Server with Matchmaking!

Connect to: ws://<host>:<port>/ws
Optional query parameter: ?name=YourName

How it works:
1. Connect to the server
2. Wait for matchmaking to find you an opponent
3. Play Ultimate Tic-Tac-Toe with random X/O assignment
4. Games are automatically logged in UGN format

Game Commands:
- A1-I9: Make a move (e.g., A1, B5, I9)
- R or resign: Resign from the game
- draw / accept_draw / decline_draw: Draw by agreement
- board/show: Display the current board
- status: Show game/queue status
- help: Show this help message
- quit/exit: Leave the game
";

/// Owns the session registry and the match scheduler.
#[derive(Debug)]
pub struct GameServer {
    registry: Arc<GameRegistry>,
    scheduler: Arc<MatchScheduler>,
    config: ServerConfig,
    /// Players who left while possibly inside a forming match.
    departed: DashSet<PlayerId>,
}

impl GameServer {
    /// Creates a server with a FIFO matchmaker for the Simple mode.
    #[instrument(skip(config), fields(bind = %config.bind_addr()))]
    pub fn new(config: ServerConfig) -> Self {
        let scheduler = MatchScheduler::new(config.tick_interval());
        scheduler.register(Arc::new(FifoMatchmaker::new(
            MatchMode::Simple,
            *config.match_size(),
        )));
        info!("Creating game server");
        Self {
            registry: Arc::new(GameRegistry::new()),
            scheduler: Arc::new(scheduler),
            config,
            departed: DashSet::new(),
        }
    }

    /// Live sessions.
    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    /// The match scheduler.
    pub fn scheduler(&self) -> &MatchScheduler {
        &self.scheduler
    }

    /// Effective configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Starts the matchmaking loop with this server as the match handler.
    pub fn start(self: &Arc<Self>) {
        let handler: Arc<dyn MatchHandler> = Arc::clone(self) as Arc<dyn MatchHandler>;
        self.scheduler.start(handler);
    }

    /// Stops the matchmaking loop.
    pub fn shutdown(&self) {
        self.scheduler.stop();
    }

    /// HTTP routes: `/` help text and `/ws` game socket.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/ws", get(ws_handler))
            .with_state(self)
    }

    /// Binds, starts matchmaking and serves until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or serving fails.
    pub async fn serve(
        self: Arc<Self>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        info!(addr = %self.config.bind_addr(), "WebSocket endpoint: /ws");

        self.start();
        let app = Arc::clone(&self)
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;
        self.shutdown();
        result
    }

    /// Registers a new client: welcome, then queue for a match.
    ///
    /// Returns `None` if the player could not be queued; the client has
    /// already been told why.
    #[instrument(skip(self, handle))]
    pub fn connect(self: &Arc<Self>, name: String, handle: ClientHandle) -> Option<PlayerConnection> {
        let id = generate_player_id();
        let conn = PlayerConnection {
            server: Arc::clone(self),
            id: id.clone(),
            name: name.clone(),
            handle: handle.clone(),
            session: None,
        };

        conn.reply(ServerMessage::Welcome(WelcomePayload {
            player_id: id.clone(),
            player_name: name.clone(),
            message: format!("Welcome {}! Finding you a match...", name),
        }));
        info!(player_id = %id, "Player connected");

        let request = PlayerRequest::new(id, name, handle, MatchMode::Simple);
        if let Err(e) = self.scheduler.add_player(request) {
            warn!(error = %e, "Could not queue player");
            conn.reply(ServerMessage::error(e.to_string()));
            return None;
        }

        conn.reply(ServerMessage::info(format!(
            "You're in the matchmaking queue. Players waiting: {}",
            self.scheduler.total_queued()
        )));
        Some(conn)
    }
}

impl GameServer {
    fn start_match(&self, game_match: &GameMatch) -> Result<(), MatchError> {
        let recorder = Box::new(UgnRecorder::new(self.config.games_dir().clone()));
        let session =
            GameSession::from_match(game_match, Some(recorder), &mut rand::thread_rng())
                .map_err(|e| MatchError::new(&game_match.id, e.to_string()))?;
        let session = Arc::new(session);

        self.registry
            .register(Arc::clone(&session))
            .map_err(|e| MatchError::new(&game_match.id, e.to_string()))?;

        for player in session.players() {
            session.send_to(
                &player.id,
                ServerMessage::GameState(Box::new(session.state_for(&player.id))),
            );
            session.send_to(
                &player.id,
                ServerMessage::info(format!(
                    "Match found! Game ID: {}. You are player {}",
                    session.id(),
                    player.mark
                )),
            );
        }

        info!(
            player_x = %session.name_of(ultimate_board::Mark::X).unwrap_or_default(),
            player_o = %session.name_of(ultimate_board::Mark::O).unwrap_or_default(),
            "Game started"
        );

        // Players dequeued by this tick could not find the session when
        // they disconnected.
        for player in session.players() {
            if self.departed.remove(&player.id).is_some() {
                info!(player_id = %player.id, "Player left while the match was forming");
                self.leave(&session, &player.id, &player.name);
            }
        }
        Ok(())
    }

    /// Empties a departed player's seat and tells the opponent. Only the
    /// call that empties the seat sends the notice.
    fn leave(&self, session: &GameSession, player_id: &str, name: &str) {
        if session.detach_player(player_id).is_none() {
            return;
        }
        self.registry.forget_player(player_id);
        info!(session_id = %session.id(), player_id, "Player disconnected from game");

        if let Some(opponent) = session.opponent_of(player_id) {
            session.send_to(
                &opponent.id,
                ServerMessage::info(format!("Player {} has disconnected", name)),
            );
        }
    }
}

impl MatchHandler for GameServer {
    #[instrument(skip(self, game_match), fields(match_id = %game_match.id))]
    fn on_match(&self, game_match: GameMatch) -> Result<(), MatchError> {
        let started = self.start_match(&game_match);
        if started.is_err() {
            for player in &game_match.players {
                self.departed.remove(&player.id);
            }
        }
        started
    }
}

/// One connected client, from welcome to disconnect.
#[derive(Debug)]
pub struct PlayerConnection {
    server: Arc<GameServer>,
    id: PlayerId,
    name: String,
    handle: ClientHandle,
    session: Option<Arc<GameSession>>,
}

impl PlayerConnection {
    /// The generated player id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session the player was matched into, once known.
    pub fn session(&self) -> Option<&Arc<GameSession>> {
        self.session.as_ref()
    }

    fn reply(&self, message: ServerMessage) {
        if self.handle.send(message).is_err() {
            debug!(player_id = %self.id, "Reply dropped, client gone");
        }
    }

    fn find_session(&mut self) -> Option<(Arc<GameSession>, Player)> {
        if self.session.is_none() {
            self.session = self.server.registry.session_for_player(&self.id);
        }
        let session = self.session.clone()?;
        let player = session.player(&self.id)?;
        Some((session, player))
    }

    /// Handles one line of client input. Breaks on quit.
    #[instrument(skip(self), fields(player_id = %self.id))]
    pub fn handle_line(&mut self, line: &str) -> ControlFlow<()> {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                self.reply(ServerMessage::error(e.to_string()));
                return ControlFlow::Continue(());
            }
        };
        debug!(?command, "Received command");

        match command {
            Command::Quit => {
                self.reply(ServerMessage::info("Goodbye!"));
                return ControlFlow::Break(());
            }
            Command::Help => {
                self.reply(ServerMessage::info(HELP_TEXT));
                return ControlFlow::Continue(());
            }
            _ => {}
        }

        let Some((session, player)) = self.find_session() else {
            let text = if command.needs_session() {
                "Still waiting for a match... Type 'status' for queue info".to_string()
            } else {
                format!(
                    "Waiting for match... Players in queue: {}",
                    self.server.scheduler.total_queued()
                )
            };
            self.reply(ServerMessage::info(text));
            return ControlFlow::Continue(());
        };

        match command {
            Command::Status | Command::Board => self.send_state(&session),
            Command::Move(mv) => self.play(&session, &player, mv),
            Command::Resign => self.resign(&session, &player),
            Command::OfferDraw => self.offer_draw(&session),
            Command::AcceptDraw => self.accept_draw(&session),
            Command::DeclineDraw => self.decline_draw(&session),
            Command::Help | Command::Quit => {}
        }
        ControlFlow::Continue(())
    }

    fn send_state(&self, session: &GameSession) {
        self.reply(ServerMessage::GameState(Box::new(session.state_for(&self.id))));
    }

    fn play(&self, session: &GameSession, player: &Player, mv: Move) {
        let report = match session.make_move(&self.id, mv) {
            Ok(report) => report,
            Err(e) => {
                self.reply(ServerMessage::error(format!("Invalid move: {}", e)));
                return;
            }
        };

        session.broadcast(&ServerMessage::Move(MovePayload {
            player_name: self.name.clone(),
            player_symbol: player.mark.to_string(),
            r#move: mv.to_string(),
            board_index: report.mv.board(),
            position: report.mv.cell(),
        }));
        session.broadcast_state();

        if let Some(result) = session.result() {
            let winner_name = match result {
                GameResult::Winner(mark) => session.name_of(mark).unwrap_or_default(),
                GameResult::Draw => "Draw".to_string(),
            };
            session.broadcast(&ServerMessage::GameOver(GameOverPayload {
                winner: result.to_string(),
                winner_name,
                message: session.status_line(),
                comment: String::new(),
            }));
        }
    }

    fn resign(&self, session: &GameSession, player: &Player) {
        let result = match session.resign(&self.id) {
            Ok(result) => result,
            Err(e) => {
                self.reply(ServerMessage::error(format!("Cannot resign: {}", e)));
                return;
            }
        };

        session.broadcast(&ServerMessage::info(format!(
            "Player {} ({}) has resigned!",
            self.name, player.mark
        )));
        session.broadcast_state();

        let winner_name = result
            .winner()
            .and_then(|mark| session.name_of(mark))
            .unwrap_or_default();
        session.broadcast(&ServerMessage::GameOver(GameOverPayload {
            winner: result.to_string(),
            message: format!("{} wins by resignation!", winner_name),
            winner_name,
            comment: "resignation".to_string(),
        }));
    }

    fn offer_draw(&self, session: &GameSession) {
        if let Err(e) = session.offer_draw(&self.id) {
            self.reply(ServerMessage::error(format!("Cannot offer draw: {}", e)));
            return;
        }

        if let Some(opponent) = session.opponent_of(&self.id) {
            session.send_to(
                &opponent.id,
                ServerMessage::DrawOffer(DrawOfferPayload {
                    offered_by: self.name.clone(),
                    message: format!(
                        "Player {} has offered a draw. Type ACCEPT_DRAW or DECLINE_DRAW",
                        self.name
                    ),
                }),
            );
        }
        self.reply(ServerMessage::info("Draw offer sent"));
    }

    fn accept_draw(&self, session: &GameSession) {
        if let Err(e) = session.accept_draw(&self.id) {
            self.reply(ServerMessage::error(e.to_string()));
            return;
        }

        session.broadcast(&ServerMessage::info(
            "Draw offer accepted! Game ended in a draw.",
        ));
        session.broadcast_state();
        session.broadcast(&ServerMessage::GameOver(GameOverPayload {
            winner: GameResult::Draw.to_string(),
            winner_name: "Draw".to_string(),
            message: "Game ended in a draw by agreement".to_string(),
            comment: "agreement".to_string(),
        }));
    }

    fn decline_draw(&self, session: &GameSession) {
        if let Err(e) = session.decline_draw(&self.id) {
            self.reply(ServerMessage::error(e.to_string()));
            return;
        }

        if let Some(opponent) = session.opponent_of(&self.id) {
            session.send_to(&opponent.id, ServerMessage::info("Draw offer declined"));
        }
        self.reply(ServerMessage::info("Draw offer declined"));
    }

    /// Leaves the queue or the game and tells the opponent.
    #[instrument(skip(self), fields(player_id = %self.id))]
    pub fn disconnect(mut self) {
        let server = Arc::clone(&self.server);
        match server.scheduler.remove_player(&self.id) {
            Ok(()) => {
                info!("Player disconnected while in matchmaking queue");
                return;
            }
            Err(e) => debug!(error = %e, "Player was not queued"),
        }

        // Marked before the lookup so a match registered in between still
        // sees it.
        server.departed.insert(self.id.clone());
        if let Some((session, _)) = self.find_session() {
            server.departed.remove(&self.id);
            server.leave(&session, &self.id, &self.name);
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConnectParams {
    name: Option<String>,
}

/// Longest display name kept from the query string, in characters.
pub const MAX_NAME_LEN: usize = 32;

/// Drops control characters and surrounding whitespace from a requested
/// display name and caps its length.
pub fn clean_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .chars()
        .take(MAX_NAME_LEN)
        .collect()
}

async fn index() -> &'static str {
    INDEX_TEXT
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<GameServer>>,
) -> Response {
    let name = params
        .name
        .as_deref()
        .map(clean_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| addr.to_string());
    ws.on_upgrade(move |socket| handle_socket(server, socket, name))
}

/// Runs one WebSocket connection until the client leaves.
#[instrument(skip(server, socket))]
async fn handle_socket(server: Arc<GameServer>, socket: WebSocket, name: String) {
    let (mut sink, mut stream) = socket.split();
    let (handle, mut rx) = ClientHandle::channel();

    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Failed to encode message");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    if let Some(mut conn) = server.connect(name, handle) {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if conn.handle_line(text.as_str()).is_break() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!(error = %e, "WebSocket read failed");
                    break;
                }
            }
        }
        conn.disconnect();
    }

    // The writer flushes what is queued and exits once the last handle
    // drops or the socket rejects a send.
    drop(writer);
}
