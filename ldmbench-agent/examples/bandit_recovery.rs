//! Example: model recovery between two bandit strategies

use ldmbench_agent::{NwslsAgent, ParamInit, PolicyModel, RandomRespondAgent};
use ldmbench_core::{
    init_logging, model_recovery, Env, InteractiveTest, LogLevel, Model, ModelTest,
    MultiTrajectory, Params, ScoreKind,
};
use ldmbench_env::BanditEnv;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging(LogLevel::Info);

    // Two candidate models over a 2-armed bandit
    let nwsls = PolicyModel::new(
        "nwsls",
        NwslsAgent::new(0.1, 2, 1),
        1,
        ParamInit::Fixed(Params::new().with("epsilon", 0.1)),
    )?;
    let random = PolicyModel::new(
        "random-respond",
        RandomRespondAgent::new(0.5, 1, 2, 1, 2),
        2,
        ParamInit::Fixed(Params::new().with("bias", 0.5)),
    )?;
    let mut models: Vec<Box<dyn Model>> = vec![Box::new(nwsls), Box::new(random)];

    // Simulate each model against the bandit, then judge every model on
    // every synthesized dataset by negative log-likelihood
    let env_factory = || -> Box<dyn Env> { Box::new(BanditEnv::new(vec![0.2, 0.8], 7).unwrap()) };
    let test_factory = |name: String, bundles: MultiTrajectory| -> Box<dyn ModelTest> {
        Box::new(InteractiveTest::new(
            name,
            bundles.into_iter().next().unwrap(),
            ScoreKind::Nll,
        ))
    };
    let matrix = model_recovery(&mut models, &env_factory, &test_factory, 200)?;

    // Print the confusion matrix as CSV; the diagonal should win
    let mut csv = Vec::new();
    matrix.to_csv(&mut csv)?;
    print!("{}", String::from_utf8(csv)?);

    Ok(())
}
