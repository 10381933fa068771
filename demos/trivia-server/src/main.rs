use quizroom::prelude::*;

/// Questions shipped with the binary, used when the config names no bank.
const BUNDLED_QUESTIONS: &str = include_str!("../questions.json");

fn config_path() -> String {
    std::env::var("QUIZROOM_CONFIG").unwrap_or_else(|_| "quizroom.toml".to_string())
}

fn question_bank(config: &ServerConfig) -> Result<QuestionBank, QuizroomError> {
    if config.question_bank.is_some() {
        return config.load_question_bank();
    }
    let bank = QuestionBank::from_json(BUNDLED_QUESTIONS)?;
    tracing::info!(categories = ?bank.categories(), "using bundled question bank");
    Ok(bank)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    quizroom::logging::init(env!("CARGO_PKG_NAME"), "info");

    let config = ServerConfig::load(config_path());
    let bank = question_bank(&config)?;

    let server = QuizroomServer::builder()
        .config(config)
        .question_bank(bank)
        .build()
        .await?;
    tracing::info!(addr = %server.local_addr()?, "trivia server ready");

    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio_tungstenite::tungstenite::Message;

    type Ws = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    #[test]
    fn test_bundled_bank_is_valid() {
        let bank = QuestionBank::from_json(BUNDLED_QUESTIONS).unwrap();
        assert!(bank.len("general") >= GameConfig::default().questions_per_game);
        assert_eq!(bank.categories(), vec!["general", "science"]);
    }

    async fn start() -> String {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".into(),
            ..ServerConfig::default()
        };
        let server = QuizroomServer::builder()
            .config(config.clone())
            .question_bank(question_bank(&config).unwrap())
            .build()
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(server.run_until(std::future::pending()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        addr
    }

    async fn ws(addr: &str) -> Ws {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        ws
    }

    async fn next_json(ws: &mut Ws) -> serde_json::Value {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        serde_json::from_str(msg.to_text().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_host_starts_match_with_bundled_questions() {
        let addr = start().await;
        let mut host = ws(&addr).await;

        host.send(Message::text(r#"{"event":"createRoom","data":{"hostName":"Ada"}}"#))
            .await
            .unwrap();
        let created = next_json(&mut host).await;
        assert_eq!(created["event"], "roomCreated");
        let room_id = created["data"]["roomId"].as_str().unwrap().to_string();

        let join = serde_json::json!({
            "event": "joinRoom",
            "data": { "roomId": room_id, "playerName": "Ada" }
        });
        host.send(Message::text(join.to_string())).await.unwrap();
        let update = next_json(&mut host).await;
        assert_eq!(update["event"], "roomUpdate");
        assert_eq!(update["data"]["isHost"], true);

        let start = serde_json::json!({ "event": "startGame", "data": { "roomId": room_id } });
        host.send(Message::text(start.to_string())).await.unwrap();
        assert_eq!(next_json(&mut host).await["event"], "gameStarted");
    }
}
