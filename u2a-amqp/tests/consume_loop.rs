//! Consumption loop driven through the public API with in-memory sources.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use async_trait::async_trait;
use bytes::Bytes;
use u2a_amqp::prelude::*;
use u2a_core::delivery::{Acker, Delivery};
use u2a_core::error::{Result, U2aError};
use u2a_core::event::Event;
use u2a_core::shutdown::Shutdown;

#[derive(Clone, Default)]
struct Acks(Rc<RefCell<Vec<u64>>>);

#[async_trait(?Send)]
impl Acker for Acks {
    async fn ack(&self, delivery_tag: u64) -> Result<()> {
        self.0.borrow_mut().push(delivery_tag);
        Ok(())
    }
}

enum Step {
    Body(Vec<u8>),
    Fail,
}

struct Script {
    steps: VecDeque<Step>,
    tag: u64,
    acks: Acks,
}

impl Script {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            tag: 0,
            acks: Acks::default(),
        }
    }
}

#[async_trait(?Send)]
impl DeliverySource for Script {
    type Acker = Acks;

    async fn next_delivery(&mut self) -> Option<Result<Delivery<Acks>>> {
        match self.steps.pop_front()? {
            Step::Body(body) => {
                self.tag += 1;
                Some(Ok(Delivery::new(
                    self.tag,
                    Bytes::from(body),
                    false,
                    self.acks.clone(),
                )))
            }
            Step::Fail => Some(Err(U2aError::broker("connection reset by broker"))),
        }
    }
}

fn event_body(index: u64) -> Vec<u8> {
    Event::now(index).encode().unwrap().to_vec()
}

#[compio::test]
async fn prints_events_in_delivery_order() {
    let mut source = Script::new((0..5).map(|i| Step::Body(event_body(i))).collect());
    let mut consumer = QueueConsumer::new(StdoutHandler::new(Vec::new()));

    let end = consumer.run(&mut source, &Shutdown::never()).await.unwrap();
    assert_eq!(end, ConsumeEnd::StreamClosed);
    assert_eq!(*source.acks.0.borrow(), vec![1, 2, 3, 4, 5]);

    let output = String::from_utf8(consumer.into_handler().into_inner()).unwrap();
    let indices: Vec<u64> = output
        .lines()
        .map(|line| Event::decode(line.as_bytes()).unwrap().index)
        .collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

#[compio::test]
async fn broker_failure_surfaces_as_recoverable() {
    let mut source = Script::new(vec![Step::Body(b"one".to_vec()), Step::Fail]);
    let mut consumer = QueueConsumer::new(StdoutHandler::new(Vec::new()));

    let err = consumer
        .run(&mut source, &Shutdown::never())
        .await
        .unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(*source.acks.0.borrow(), vec![1]);
    assert_eq!(consumer.report().acknowledged, 1);
}

#[compio::test]
async fn output_failure_is_fatal_not_recoverable() {
    let mut source = Script::new(vec![Step::Body(b"one".to_vec()), Step::Body(b"two".to_vec())]);
    let mut consumer = QueueConsumer::new(|_: &[u8]| {
        Err::<(), _>(HandlerError::Io(std::io::Error::from(
            std::io::ErrorKind::BrokenPipe,
        )))
    });

    let err = consumer
        .run(&mut source, &Shutdown::never())
        .await
        .unwrap_err();

    // The reconnecting consumer only rebuilds sessions for recoverable errors.
    assert!(matches!(err, U2aError::Output(_)));
    assert!(!err.is_recoverable());
    assert!(source.acks.0.borrow().is_empty());
    assert_eq!(source.steps.len(), 1);
}

#[compio::test]
async fn report_accumulates_across_runs() {
    let mut consumer = QueueConsumer::new(StdoutHandler::new(Vec::new()));

    let mut first = Script::new(vec![Step::Body(b"a".to_vec()), Step::Body(vec![0x80])]);
    consumer.run(&mut first, &Shutdown::never()).await.unwrap();

    let mut second = Script::new(vec![Step::Body(b"b".to_vec())]);
    consumer.run(&mut second, &Shutdown::never()).await.unwrap();

    assert_eq!(
        consumer.report(),
        ConsumeReport {
            delivered: 3,
            acknowledged: 2,
            rejected: 1,
        }
    );
    assert_eq!(consumer.into_handler().into_inner(), b"a\nb\n");
}
