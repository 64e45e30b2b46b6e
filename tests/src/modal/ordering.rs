use std::sync::Arc;

use netsift_core::modal::ModalQueueManager;
use netsift_core::prompt::Prompter;
use netsift_core::surface::{InputPrompt, Notice};
use netsift_core::ui;

use crate::fakes::ScriptedSurface;

fn prompter(surface: Arc<ScriptedSurface>) -> Prompter {
    let (dispatcher, ui_loop) = ui::channel();
    ui_loop.spawn().unwrap();
    Prompter::new(ModalQueueManager::new(dispatcher), surface)
}

#[tokio::test(flavor = "current_thread")]
async fn concurrent_prompts_are_shown_one_at_a_time_in_order() {
    let mut surface = ScriptedSurface::new();
    for i in 0..6 {
        surface = surface.answer(&format!("answer-{i}"));
    }
    let surface = Arc::new(surface);
    let prompter = prompter(surface.clone());

    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let prompter = prompter.clone();
            tokio::spawn(async move {
                prompter
                    .input(InputPrompt::new("Queue", &format!("prompt-{i}")))
                    .await
            })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap(), Some(format!("answer-{i}")));
    }

    let shown: Vec<String> = surface
        .events()
        .into_iter()
        .filter(|e| e.starts_with("input:"))
        .collect();
    let expected: Vec<String> = (0..6).map(|i| format!("input:prompt-{i}=")).collect();
    assert_eq!(shown, expected);
    assert_eq!(surface.max_concurrent(), 1);
    assert!(!prompter.modals().is_active());
}

#[tokio::test]
async fn notices_wait_for_the_active_prompt() {
    let surface = Arc::new(ScriptedSurface::new().answer("10.0.0.0/24"));
    let prompter = prompter(surface.clone());

    let asking = {
        let prompter = prompter.clone();
        tokio::spawn(async move { prompter.input(InputPrompt::new("Scan", "range")).await })
    };
    // Let the prompt get its slot first.
    tokio::task::yield_now().await;
    while !prompter.modals().is_active() && surface.events().is_empty() {
        tokio::task::yield_now().await;
    }

    prompter.notify(Notice::info("Heads up", "queued behind the prompt")).await;
    assert_eq!(asking.await.unwrap(), Some("10.0.0.0/24".into()));

    assert_eq!(
        surface.events(),
        vec![
            "input:range=".to_string(),
            "notice:Heads up:queued behind the prompt".to_string(),
        ]
    );
    assert_eq!(surface.max_concurrent(), 1);
}
