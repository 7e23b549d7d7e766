use tradebot_engine::{NullSignalSource, SignalSource};

#[tokio::test]
async fn null_signal_source_never_produces_anything() {
    let mut source: Box<dyn SignalSource> = Box::new(NullSignalSource);
    assert!(source.poll().await.is_empty());
    // Repeated polls stay empty — there's no hidden internal state that
    // could make this source start emitting after the first call.
    assert!(source.poll().await.is_empty());
}
