use addgym::env::{ScriptedAgent, run_episode};
use addgym::{AddEnv, Env, EnvConfig, Tokenizer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Starting addgym rollout example");

    let config = EnvConfig {
        seed: Some(7),
        ..EnvConfig::default()
    };
    let mut env = AddEnv::from_config(config.clone())?;

    // A second environment with the same seed predicts the next question.
    let mut probe = AddEnv::from_config(config)?;
    probe.reset()?;
    let (a, b) = probe.episode().operands();
    println!("📤 Question: What is {}+{}?", a, b);

    let script = format!("[SP]{a}+{b}>>>[ESP]{}[EOS]", a + b);
    let mut agent = ScriptedAgent::from_text(&env, &script);
    let trajectory = run_episode(&mut env, &mut agent)?;

    env.render()?;
    println!(
        "✅ Episode {} finished after {} steps: {:?} (reward {})",
        trajectory.episode_index,
        trajectory.steps.len(),
        trajectory.outcome,
        trajectory.total_reward
    );
    for step in trajectory.steps.iter().filter(|s| s.execution.is_some()) {
        if let Some(result) = &step.execution {
            println!("   interpreter: {:?}", result.text);
        }
    }

    println!("\n🔄 Gold trajectory masks");
    env.reset_with_operands(a, b)?;
    let gold = env.gold_trajectory();
    for (i, id) in gold.gold_sequence.iter().enumerate() {
        println!(
            "{:>3} {:<8} auto={:<5} trainable={}",
            i,
            env.tokenizer().decode(&[*id], true),
            gold.auto_generated[i],
            gold.trainable_mask[i]
        );
    }

    println!("\n{}", serde_json::to_string_pretty(&trajectory)?);
    Ok(())
}
