//! Tests for the progress module functionality.
//!
//! This file contains tests for the aggregator streams and the terminal
//! display fed by them.

use downpour::progress::{ProgressAggregator, ProgressDisplay, ProgressEvent, ProgressPublisher};

use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

mod common;
use common::helpers::*;

#[tokio::test]
async fn test_aggregator_streams_end_with_full_fraction() {
    let publisher = ProgressPublisher::new();
    let fractions = tokio::spawn(collect_stream(publisher.subscribe_fraction()));
    let speeds = tokio::spawn(collect_stream(publisher.subscribe_speed()));

    let (events, receiver) = mpsc::unbounded_channel();
    let stop = CancellationToken::new();
    let aggregator =
        ProgressAggregator::new(Some(3_000), TEST_INTERVAL).with_publisher(Some(publisher));
    let observer = tokio::spawn(aggregator.run(receiver, stop.clone()));

    for _ in 0..3 {
        events.send(ProgressEvent::Received(1_000)).unwrap();
        tokio::time::sleep(TEST_INTERVAL * 2).await;
    }
    stop.cancel();

    assert_eq!(observer.await.unwrap(), 3_000);

    let fractions = fractions.await.unwrap();
    assert_eq!(fractions.last().copied(), Some(1.0));
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));

    let speeds = speeds.await.unwrap();
    assert_eq!(speeds.iter().sum::<u64>(), 3_000);
}

#[tokio::test]
async fn test_aggregator_without_publisher_still_counts() {
    let (events, receiver) = mpsc::unbounded_channel();
    let stop = CancellationToken::new();
    let aggregator = ProgressAggregator::new(None, Duration::from_secs(3600));
    let observer = tokio::spawn(aggregator.run(receiver, stop.clone()));

    events.send(ProgressEvent::Received(7)).unwrap();
    events.send(ProgressEvent::Received(5)).unwrap();
    stop.cancel();

    assert_eq!(observer.await.unwrap(), 12);
}

#[tokio::test]
async fn test_display_renders_aggregator_streams() {
    let publisher = ProgressPublisher::new();
    let display = ProgressDisplay::hidden(TEST_INTERVAL);
    let rendering = tokio::spawn(display.run(
        publisher.subscribe_fraction(),
        publisher.subscribe_speed(),
    ));

    let (events, receiver) = mpsc::unbounded_channel();
    let stop = CancellationToken::new();
    let aggregator =
        ProgressAggregator::new(Some(400), TEST_INTERVAL).with_publisher(Some(publisher));
    let observer = tokio::spawn(aggregator.run(receiver, stop.clone()));

    events.send(ProgressEvent::Received(400)).unwrap();
    stop.cancel();
    observer.await.unwrap();

    let display = rendering.await.unwrap();
    assert_eq!(display.position(), ProgressDisplay::SCALE);
}
