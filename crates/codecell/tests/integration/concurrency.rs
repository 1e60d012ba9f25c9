use std::collections::HashSet;

use codecell::{Config, Dispatcher};

use super::test_config;

fn source_for(index: usize) -> (&'static str, String) {
    match index % 3 {
        0 => ("python", format!("print('request-{index}')\n")),
        1 => ("javascript", format!("console.log('request-{index}');\n")),
        _ => (
            "java",
            format!(
                "public class Req{index} {{ public static void main(String[] a) {{ System.out.println(\"request-{index}\"); }} }}\n"
            ),
        ),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_twenty_concurrent_requests_are_isolated() {
    let mut config = test_config();
    config.default_limits.wall_time_limit = Some(20.0);
    let dispatcher = Dispatcher::new(config);

    let tasks: Vec<_> = (0..20)
        .map(|index| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                let (language, source) = source_for(index);
                (index, dispatcher.dispatch(language, &source).await)
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for task in tasks {
        let (index, result) = task.await.unwrap();
        assert!(result.is_success(), "request {index}: {result:?}");
        assert_eq!(result.stdout, format!("request-{index}\n"));
        assert!(result.stderr.is_empty(), "request {index}: {}", result.stderr);
        assert!(seen.insert(index));
    }

    assert_eq!(dispatcher.pool().available(), dispatcher.config().max_concurrent);
}

#[tokio::test]
async fn test_workspaces_are_reclaimed() {
    let root = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.temp_root = Some(root.path().to_path_buf());
    config.default_limits.wall_time_limit = Some(1.0);
    let dispatcher = Dispatcher::new(config);

    dispatcher.dispatch("python", "print(1)").await;
    dispatcher.dispatch("python", "while True: pass").await;
    dispatcher.dispatch("javascript", "throw new Error('x')").await;
    dispatcher
        .dispatch("java", "class A { public static void main(String[] a) {} }")
        .await;

    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
