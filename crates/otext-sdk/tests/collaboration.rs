//! End-to-end tests: collaborators and a document server over memory
//! transports.

use otext_sdk::{
    ClientConfigBuilder, ClientState, Collaborator, DocEvent, DocumentServer, Frame,
    MemoryTransport, SdkError, ServerConfigBuilder,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

struct Setup {
    server: Arc<DocumentServer<MemoryTransport>>,
    task: JoinHandle<otext_sdk::Result<()>>,
    collaborators: Vec<Arc<Collaborator<MemoryTransport>>>,
}

async fn setup(text: &str, names: &[&str]) -> Setup {
    let hub = MemoryTransport::new(otext_sdk::EndpointId::new("server"));
    let collaborators: Vec<_> = names
        .iter()
        .map(|name| {
            let config = ClientConfigBuilder::new()
                .user_name(*name)
                .client_id(*name)
                .build();
            Arc::new(Collaborator::new_with_memory_transport(config, &hub).unwrap())
        })
        .collect();

    let config = ServerConfigBuilder::new()
        .document_id("test-doc")
        .initial_text(text)
        .build();
    let server = Arc::new(DocumentServer::new(config, Arc::new(hub)));
    let runner = server.clone();
    let task = tokio::spawn(async move { runner.run().await });

    for collaborator in &collaborators {
        assert_ok!(collaborator.join().await);
    }

    Setup {
        server,
        task,
        collaborators,
    }
}

#[tokio::test]
async fn test_join_receives_snapshot() {
    let setup = setup("hello world", &["alice", "bob"]).await;

    for collaborator in &setup.collaborators {
        assert_eq!(collaborator.text(), "hello world");
        assert_eq!(collaborator.version(), 0);
    }
    assert_eq!(setup.server.members().len(), 2);
    setup.task.abort();
}

#[tokio::test]
async fn test_concurrent_edits_converge() {
    let setup = setup("hello world", &["alice", "bob"]).await;
    let (alice, bob) = (&setup.collaborators[0], &setup.collaborators[1]);

    assert_ok!(alice.edit("hello, world").await);
    assert_ok!(bob.edit("hello world!").await);

    assert_ok!(alice.sync_to(2).await);
    assert_ok!(bob.sync_to(2).await);

    assert_eq!(setup.server.text(), "hello, world!");
    assert_eq!(alice.text(), "hello, world!");
    assert_eq!(bob.text(), "hello, world!");
    assert_eq!(alice.state(), ClientState::Synchronized);
    assert_eq!(bob.state(), ClientState::Synchronized);
    setup.task.abort();
}

#[tokio::test]
async fn test_events_follow_the_protocol() {
    let setup = setup("", &["alice", "bob"]).await;
    let (alice, bob) = (&setup.collaborators[0], &setup.collaborators[1]);
    let mut alice_events = alice.subscribe();
    let mut bob_events = bob.subscribe();

    assert_ok!(alice.edit("abc").await);
    assert_ok!(alice.flush().await);
    assert_ok!(bob.sync_to(1).await);

    assert!(matches!(
        alice_events.recv().await.unwrap(),
        DocEvent::LocalEdit { .. }
    ));
    assert_eq!(
        alice_events.recv().await.unwrap(),
        DocEvent::Acknowledged { revision: 1 }
    );
    match bob_events.recv().await.unwrap() {
        DocEvent::RemoteEdit {
            revision, author, ..
        } => {
            assert_eq!(revision, 1);
            assert_eq!(author.as_str(), "alice");
        }
        other => panic!("unexpected event {:?}", other),
    }
    setup.task.abort();
}

#[tokio::test]
async fn test_rejection_resyncs_from_snapshot() {
    let setup = setup("abc", &["alice"]).await;
    let alice = &setup.collaborators[0];
    let mut events = alice.subscribe();

    let result = alice
        .handle_frame(Frame::Rejected {
            reason: "test".into(),
        })
        .await;
    assert!(matches!(assert_err!(result), SdkError::Rejected(_)));

    let welcome = assert_ok!(alice.next_frame().await);
    assert!(matches!(welcome, Frame::Welcome(_)));
    assert_ok!(alice.handle_frame(welcome).await);

    assert_eq!(
        events.recv().await.unwrap(),
        DocEvent::Rejected {
            reason: "test".into()
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        DocEvent::Resynced { revision: 0 }
    );
    assert_eq!(alice.text(), "abc");
    setup.task.abort();
}

#[tokio::test]
async fn test_many_collaborators_sequential_rounds() {
    let names = ["a", "b", "c"];
    let setup = setup("", &names).await;

    let mut handles = Vec::new();
    for (idx, collaborator) in setup.collaborators.iter().enumerate() {
        let collaborator = collaborator.clone();
        handles.push(tokio::spawn(async move {
            for round in 0..5 {
                let mut text: Vec<char> = collaborator.text().chars().collect();
                let at = (idx * 7 + round * 3) % (text.len() + 1);
                text.insert(at, char::from(b'a' + idx as u8));
                let text: String = text.into_iter().collect();
                collaborator.edit(&text).await?;
                collaborator.flush().await?;
            }
            Ok::<_, SdkError>(())
        }));
    }
    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    let total = 5 * names.len() as u64;
    assert_eq!(setup.server.version(), total);
    for collaborator in &setup.collaborators {
        assert_ok!(collaborator.sync_to(total).await);
        assert_eq!(collaborator.text(), setup.server.text());
    }
    assert_eq!(setup.server.text().chars().count(), 15);
    setup.task.abort();
}
