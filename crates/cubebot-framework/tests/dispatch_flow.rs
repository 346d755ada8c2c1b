//! End-to-end dispatch through modules, awaited modals and correlated modals.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use cubebot_core::testing::{GatewayCall, RecordingGateway, fixtures};
use cubebot_framework::prelude::*;
use cubebot_framework::{
    DispatchOutcome, Dispatcher, HandlerRegistry, RunOutcome, Session, SUBMITTED_MESSAGE,
};

// ─── Awaited modal ────────────────────────────────────────────────────────────

async fn rename(ctx: Arc<InteractionContext>) -> HandlerResult {
    let form = ModalSpec::new("rename-form", "Rename")
        .text_input(TextInputSpec::new("name", "New name"));
    let Some(submission) = ctx.await_modal(form, Some(Duration::from_secs(30))).await? else {
        return Ok(());
    };
    let name = submission.required_field("name")?;
    if name.len() > 8 {
        user_err!("Name `{name}` is too long");
    }
    Ok(())
}

// ─── Correlated modal ─────────────────────────────────────────────────────────

static ECHO_MODAL: LazyLock<Arc<ModalConstructor<String>>> = LazyLock::new(|| {
    Arc::new(ModalConstructor::new(
        "echo-to",
        |modal, _channel: &String| {
            modal
                .title("Echo")
                .text_input(TextInputSpec::new("message", "Message"))
        },
        |ctx, channel| async move {
            let message = ctx.required_field("message")?.to_string();
            ctx.send_message(&channel, message).await?;
            Ok(())
        },
    ))
});

async fn open_echo(ctx: Arc<InteractionContext>) -> HandlerResult {
    let channel = ctx.required_channel("channel")?.to_string();
    ctx.show_modal(ECHO_MODAL.construct(channel)?).await?;
    Ok(())
}

static FORMS: ModuleDescriptor = ModuleDescriptor::new("forms", |builder| {
    builder.handler(command(CommandSpec::new("rename", "Rename yourself")).run(rename));
    builder.include(&ECHO)?;
    Ok(())
});

static ECHO: ModuleDescriptor = ModuleDescriptor::new("forms::echo", |builder| {
    builder
        .handler(
            command(
                CommandSpec::new("echo", "Echo into a channel")
                    .option(OptionSpec::channel("channel", "Target").required(true)),
            )
            .run(open_echo),
        )
        .handler(ECHO_MODAL.handler());
    Ok(())
});

fn setup() -> (Arc<RecordingGateway>, Dispatcher) {
    let (registry, _) = HandlerRegistry::from_modules(&[&FORMS]).unwrap();
    let gateway = Arc::new(RecordingGateway::new());
    let dispatcher = Dispatcher::new(Arc::new(registry), Session::new(gateway.clone()));
    (gateway, dispatcher)
}

async fn wait_for_calls(gateway: &RecordingGateway, n: usize) {
    while gateway.calls().len() < n {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn awaited_modal_submission_is_finalized() {
    let (gateway, dispatcher) = setup();

    let d = dispatcher.clone();
    let command = tokio::spawn(async move {
        d.dispatch(fixtures::command("1", "rename", vec![])).await
    });
    wait_for_calls(&gateway, 1).await;

    let collected = dispatcher
        .dispatch(fixtures::modal_submit("2", "rename-form", &[("name", "bob")]))
        .await;
    assert_eq!(collected, DispatchOutcome::Collected);

    let outcome = command.await.unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Handled(RunOutcome::Completed { auto_replied: true })
    );

    let calls = gateway.calls();
    assert!(matches!(calls[0], GatewayCall::ShowModal { .. }));
    match &calls[1] {
        GatewayCall::Reply {
            interaction_id,
            payload,
        } => {
            assert_eq!(interaction_id, "2");
            assert_eq!(payload.content.as_deref(), Some(SUBMITTED_MESSAGE));
        }
        other => panic!("unexpected call: {other:?}"),
    }
}

#[tokio::test]
async fn user_error_from_awaited_submission_replies_there() {
    let (gateway, dispatcher) = setup();

    let d = dispatcher.clone();
    let command = tokio::spawn(async move {
        d.dispatch(fixtures::command("1", "rename", vec![])).await
    });
    wait_for_calls(&gateway, 1).await;
    dispatcher
        .dispatch(fixtures::modal_submit("2", "rename-form", &[("name", "much-too-long")]))
        .await;

    assert_eq!(
        command.await.unwrap(),
        DispatchOutcome::Handled(RunOutcome::UserError)
    );
    let last = gateway.last_call().unwrap();
    assert_eq!(last.content(), Some("Name `much-too-long` is too long"));
    assert!(matches!(last, GatewayCall::Reply { ref interaction_id, .. } if interaction_id == "2"));
}

#[tokio::test]
async fn correlated_modal_round_trip() {
    let (gateway, dispatcher) = setup();

    let open = fixtures::command(
        "1",
        "echo",
        vec![cubebot_core::CommandOption::new(
            "channel",
            cubebot_core::OptionValue::Channel("c-42".into()),
        )],
    );
    dispatcher.dispatch(open).await;

    let GatewayCall::ShowModal { modal, .. } = gateway.calls()[0].clone() else {
        panic!("expected a modal");
    };
    assert!(modal.custom_id.starts_with("echo-to:"));

    let outcome = dispatcher
        .dispatch(fixtures::modal_submit("2", &modal.custom_id, &[("message", "hello")]))
        .await;
    assert_eq!(
        outcome,
        DispatchOutcome::Handled(RunOutcome::Completed { auto_replied: true })
    );

    let calls = gateway.calls();
    assert!(calls.iter().any(|c| matches!(
        c,
        GatewayCall::SendMessage { channel_id, .. } if channel_id == "c-42"
    )));
    assert_eq!(calls.last().unwrap().content(), Some(SUBMITTED_MESSAGE));
}
