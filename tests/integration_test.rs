//! End-to-end tests: a real listener on an ephemeral port, raw TCP clients
//! speaking the line protocol.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use banter::{registry::ConnectionRegistry, rooms::RoomDirectory, server};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_WINDOW: Duration = Duration::from_millis(300);

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(server::serve(
        listener,
        ConnectionRegistry::default(),
        RoomDirectory::default(),
    ));

    addr
}

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    /// Connects and sends the username line.
    async fn connect(addr: SocketAddr, username: &str) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();

        let mut client = TestClient {
            lines: BufReader::new(reader).lines(),
            writer,
        };
        client.send(username).await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
    }

    /// Joins a room and waits for the acknowledgment, so the caller knows the
    /// membership change has been applied.
    async fn join(&mut self, room: &str) {
        self.send(&format!("/join {room}")).await;
        assert_eq!(self.expect_line().await, format!("Joined chat room: {room}"));
    }

    async fn expect_line(&mut self) -> String {
        timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("server closed the connection")
    }

    /// Asserts that nothing arrives for a while.
    async fn expect_silence(&mut self) {
        let got = timeout(SILENCE_WINDOW, self.lines.next_line()).await;
        if let Ok(line) = got {
            panic!("expected silence, got {:?}", line.unwrap());
        }
    }
}

#[tokio::test]
async fn message_reaches_roommate_with_username_prefix() {
    // Scenario A
    let addr = start_server().await;

    let mut alice = TestClient::connect(addr, "alice").await;
    let mut bob = TestClient::connect(addr, "bob").await;

    alice.join("AITU").await;
    bob.join("AITU").await;

    alice.send("hello").await;

    assert_eq!(bob.expect_line().await, "alice: hello");
    // the sender never hears its own message back
    alice.expect_silence().await;
}

#[tokio::test]
async fn join_is_acknowledged_exactly_once() {
    let addr = start_server().await;

    let mut alice = TestClient::connect(addr, "alice").await;
    alice.join("NU").await;
    alice.expect_silence().await;
}

#[tokio::test]
async fn messages_never_cross_rooms() {
    // Scenario B
    let addr = start_server().await;

    let mut carol = TestClient::connect(addr, "carol").await;
    let mut carl = TestClient::connect(addr, "carl").await;
    let mut dave = TestClient::connect(addr, "dave").await;

    carol.join("NU").await;
    carl.join("NU").await;
    dave.join("AITU").await;

    carol.send("nu folks only").await;

    // delivery inside NU happened, so the broadcast is done
    assert_eq!(carl.expect_line().await, "carol: nu folks only");
    dave.expect_silence().await;
}

#[tokio::test]
async fn invalid_join_is_silent_and_leaves_client_unjoined() {
    // Scenario C
    let addr = start_server().await;

    let mut eve = TestClient::connect(addr, "eve").await;
    let mut mallory = TestClient::connect(addr, "mallory").await;
    mallory.join("AITU").await;

    eve.send("/join Mars").await;
    eve.expect_silence().await;

    // still unjoined, so the message goes nowhere
    eve.send("anyone?").await;
    mallory.expect_silence().await;

    // the connection itself is unharmed
    eve.join("AITU").await;
}

#[tokio::test]
async fn abrupt_disconnect_is_cleaned_up() {
    // Scenario D
    let addr = start_server().await;

    let mut frank = TestClient::connect(addr, "frank").await;
    let mut grace = TestClient::connect(addr, "grace").await;
    let mut heidi = TestClient::connect(addr, "heidi").await;

    frank.join("ENU").await;
    grace.join("ENU").await;
    heidi.join("ENU").await;

    // stream closed without any exit message
    drop(frank);
    tokio::time::sleep(Duration::from_millis(200)).await;

    grace.send("still here").await;
    assert_eq!(heidi.expect_line().await, "grace: still here");
    grace.expect_silence().await;
}

const MESSAGES_PER_SENDER: usize = 50;

async fn flood(mut client: TestClient, name: &'static str) -> TestClient {
    for i in 0..MESSAGES_PER_SENDER {
        client.send(&format!("{name} message {i}")).await;
    }
    client
}

#[tokio::test]
async fn concurrent_broadcasts_arrive_as_intact_lines() {
    let addr = start_server().await;

    let mut carol = TestClient::connect(addr, "carol").await;
    let mut alice = TestClient::connect(addr, "alice").await;
    let mut bob = TestClient::connect(addr, "bob").await;

    carol.join("AITU").await;
    alice.join("AITU").await;
    bob.join("AITU").await;

    // Two senders firing at the same time. Every line carol reads must be
    // one whole message, never a fragment of one spliced into another, and
    // each sender's messages must arrive in the order it sent them.
    let alice_task = tokio::spawn(flood(alice, "alice"));
    let bob_task = tokio::spawn(flood(bob, "bob"));

    let mut next_alice = 0;
    let mut next_bob = 0;
    for _ in 0..2 * MESSAGES_PER_SENDER {
        let line = carol.expect_line().await;
        if line == format!("alice: alice message {next_alice}") {
            next_alice += 1;
        } else if line == format!("bob: bob message {next_bob}") {
            next_bob += 1;
        } else {
            panic!("mangled or out-of-order line: {line:?}");
        }
    }
    assert_eq!(next_alice, MESSAGES_PER_SENDER);
    assert_eq!(next_bob, MESSAGES_PER_SENDER);

    // keep the senders' connections open until all deliveries are checked
    let _alice = alice_task.await.unwrap();
    let _bob = bob_task.await.unwrap();
}

#[tokio::test]
async fn joining_a_second_room_leaves_the_first() {
    let addr = start_server().await;

    let mut alice = TestClient::connect(addr, "alice").await;
    let mut bob = TestClient::connect(addr, "bob").await;

    alice.join("AITU").await;
    bob.join("AITU").await;

    // moving rooms drops the old membership
    alice.join("ENU").await;

    bob.send("anyone left?").await;
    alice.expect_silence().await;
}
