//! Daily transition rules.
//!
//! Each algorithm fully replaces the infection step of one simulated day;
//! vaccination always runs first and progression/waning follow the same
//! rules everywhere. A day is a single index-order sweep over the
//! population, so each agent is handled exactly once per day.

use crate::config::{Algorithm, Config};
use crate::model::{Agent, Status, VACCINE_IMMUNITY_DAYS};
use rand::prelude::*;

/// Maximum distance at which the contact-distance algorithm can infect.
const CONTACT_RADIUS: f64 = 5.0;

/// Daily probability that an exposed agent turns infectious (mean incubation
/// of about five days).
const INCUBATION_PROBABILITY: f64 = 0.2;

/// Apply one day of disease dynamics to a post-movement population.
pub(crate) fn run_day<R: Rng>(cfg: &Config, agents: &mut [Agent], rng: &mut R) {
    let mut vaccinated_today = vec![false; agents.len()];
    vaccination_pass(cfg, agents, rng, &mut vaccinated_today);

    match cfg.algorithm {
        Algorithm::Standard => standard_pass(cfg, agents, rng, &vaccinated_today),
        Algorithm::Sir => sir_pass(cfg, agents, rng, &vaccinated_today),
        Algorithm::Seir => seir_pass(cfg, agents, rng, &vaccinated_today),
        Algorithm::Network => network_pass(cfg, agents, rng, &vaccinated_today),
    }
}

/// Offer vaccines to a share of the susceptible population.
///
/// Failed doses leave the agent susceptible; it may be drawn again on a
/// later day. Successful doses grant durable immunity and are exempt from
/// waning until the next day.
fn vaccination_pass<R: Rng>(
    cfg: &Config,
    agents: &mut [Agent],
    rng: &mut R,
    vaccinated_today: &mut [bool],
) {
    if cfg.vaccination_rate <= 0.0 {
        return;
    }

    let susceptible: Vec<usize> = agents
        .iter()
        .enumerate()
        .filter(|(_, agent)| agent.status == Status::Susceptible)
        .map(|(idx, _)| idx)
        .collect();

    let doses = (cfg.vaccination_rate * susceptible.len() as f64 / 100.0) as usize;
    let drawn: Vec<usize> = susceptible.choose_multiple(rng, doses).copied().collect();

    for idx in drawn {
        if rng.random::<f64>() < cfg.vaccination_effectiveness {
            let agent = &mut agents[idx];
            agent.status = Status::Recovered;
            agent.immune_days = VACCINE_IMMUNITY_DAYS;
            agent.exposed = false;
            agent.exposure_days = 0;
            vaccinated_today[idx] = true;
        }
    }
}

/// Contact-distance rule: every infected agent rolls against each
/// susceptible agent within [`CONTACT_RADIUS`].
///
/// Infections commit immediately, so an agent infected early in the sweep
/// spreads and progresses later in the same sweep.
fn standard_pass<R: Rng>(
    cfg: &Config,
    agents: &mut [Agent],
    rng: &mut R,
    vaccinated_today: &[bool],
) {
    for i in 0..agents.len() {
        match agents[i].status {
            Status::Infected => {
                let _contacts_today =
                    (cfg.contacts_per_day as f64 * contact_multiplier(cfg)) as usize;

                for j in 0..agents.len() {
                    if j == i || agents[j].status != Status::Susceptible {
                        continue;
                    }
                    let distance = agents[i].distance_to(&agents[j]);
                    if distance < CONTACT_RADIUS
                        && rng.random::<f64>() < infection_chance(cfg.infection_rate, distance)
                    {
                        agents[j].infect();
                    }
                }

                progress_infected(cfg, &mut agents[i], rng);
            }
            Status::Recovered if !vaccinated_today[i] => wane(&mut agents[i]),
            _ => {}
        }
    }
}

/// Compartmental SIR rule: every susceptible agent is infected with the
/// mass-action probability `1 - (1 - beta)^I`.
fn sir_pass<R: Rng>(cfg: &Config, agents: &mut [Agent], rng: &mut R, vaccinated_today: &[bool]) {
    let infected = count_infected(agents);
    let chance = mass_action_chance(cfg, infected, agents.len());

    for i in 0..agents.len() {
        match agents[i].status {
            Status::Susceptible => {
                if infected > 0 && rng.random::<f64>() < chance {
                    agents[i].infect();
                }
            }
            Status::Infected => progress_infected(cfg, &mut agents[i], rng),
            Status::Recovered if !vaccinated_today[i] => wane(&mut agents[i]),
            _ => {}
        }
    }
}

/// Compartmental SEIR rule: susceptible agents become exposed with the
/// mass-action probability and incubate into the infected compartment with
/// [`INCUBATION_PROBABILITY`] per day.
///
/// Exposure is a flag on a susceptible-status agent, not a fifth status.
fn seir_pass<R: Rng>(cfg: &Config, agents: &mut [Agent], rng: &mut R, vaccinated_today: &[bool]) {
    let infected = count_infected(agents);
    let chance = mass_action_chance(cfg, infected, agents.len());

    for i in 0..agents.len() {
        match agents[i].status {
            Status::Susceptible if !agents[i].exposed => {
                if infected > 0 && rng.random::<f64>() < chance {
                    agents[i].exposed = true;
                    agents[i].exposure_days = 0;
                }
            }
            Status::Susceptible => {
                let agent = &mut agents[i];
                agent.exposure_days += 1;
                if rng.random::<f64>() < INCUBATION_PROBABILITY {
                    agent.infect();
                }
            }
            Status::Infected => progress_infected(cfg, &mut agents[i], rng),
            Status::Recovered if !vaccinated_today[i] => wane(&mut agents[i]),
            _ => {}
        }
    }
}

/// Network rule: infection travels only along each infected agent's fixed
/// connection list, with the same distance falloff as the contact-distance
/// rule but no radius cutoff.
///
/// New infections commit only after the full sweep, so an agent infected
/// today cannot spread today.
fn network_pass<R: Rng>(
    cfg: &Config,
    agents: &mut [Agent],
    rng: &mut R,
    vaccinated_today: &[bool],
) {
    let multiplier = contact_multiplier(cfg);
    let mut pending: Vec<usize> = Vec::new();

    for i in 0..agents.len() {
        match agents[i].status {
            Status::Infected => {
                let contacts = (agents[i].connections.len() as f64 * multiplier) as usize;
                let sampled: Vec<usize> = agents[i]
                    .connections
                    .choose_multiple(rng, contacts)
                    .copied()
                    .collect();

                for j in sampled {
                    if agents[j].status != Status::Susceptible {
                        continue;
                    }
                    let distance = agents[i].distance_to(&agents[j]);
                    if rng.random::<f64>() < infection_chance(cfg.infection_rate, distance) {
                        pending.push(j);
                    }
                }

                progress_infected(cfg, &mut agents[i], rng);
            }
            Status::Recovered if !vaccinated_today[i] => wane(&mut agents[i]),
            _ => {}
        }
    }

    for j in pending {
        agents[j].infect();
    }
}

/// Squared inverse-distance infection chance.
///
/// Unclamped: a draw against a chance above 1 always succeeds.
fn infection_chance(rate: f64, distance: f64) -> f64 {
    rate * (10.0 / (distance + 1.0)).powi(2)
}

fn mass_action_chance(cfg: &Config, infected: usize, population: usize) -> f64 {
    let beta = cfg.infection_rate * cfg.contacts_per_day as f64 / population as f64
        * contact_multiplier(cfg);
    1.0 - (1.0 - beta).powi(infected as i32)
}

fn contact_multiplier(cfg: &Config) -> f64 {
    let mut multiplier = 1.0;
    if cfg.social_distancing {
        multiplier *= 0.5;
    }
    if cfg.quarantine_infected {
        multiplier *= 0.2;
    }
    multiplier
}

fn count_infected(agents: &[Agent]) -> usize {
    agents
        .iter()
        .filter(|agent| agent.status == Status::Infected)
        .count()
}

/// Advance an infected agent by one day: mortality is checked first and a
/// death is never also a recovery.
fn progress_infected<R: Rng>(cfg: &Config, agent: &mut Agent, rng: &mut R) {
    agent.days_infected += 1;

    if rng.random::<f64>() < cfg.mortality_rate {
        agent.status = Status::Deceased;
    } else if rng.random::<f64>() < cfg.recovery_rate {
        agent.status = Status::Recovered;
        agent.days_infected = 0;
        agent.immune_days = cfg.immunity_period;
    }
}

/// Count down immunity; an agent reaching zero reverts to susceptible the
/// same day.
fn wane(agent: &mut Agent) {
    if agent.immune_days > 0 {
        agent.immune_days -= 1;
    }
    if agent.immune_days == 0 {
        agent.status = Status::Susceptible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MovePattern;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn test_config(algorithm: Algorithm) -> Config {
        Config {
            population_size: 10,
            initial_infected: 0,
            infection_rate: 1.0,
            recovery_rate: 0.0,
            mortality_rate: 0.0,
            immunity_period: 14,
            contacts_per_day: 10,
            social_distancing: false,
            quarantine_infected: false,
            vaccination_rate: 0.0,
            vaccination_effectiveness: 0.0,
            algorithm,
            simulation_days: 10,
            arena_width: 100.0,
            arena_height: 100.0,
            seed: None,
        }
    }

    fn agent_at(id: usize, x: f64, y: f64) -> Agent {
        Agent::new(id, x, y, 1.0, 0.0, MovePattern::Normal)
    }

    #[test]
    fn network_infection_never_reaches_unconnected_agents() {
        let cfg = Config {
            infection_rate: 10.0,
            ..test_config(Algorithm::Network)
        };
        let mut rng = ChaCha12Rng::seed_from_u64(5);

        let mut agents = vec![agent_at(0, 10.0, 10.0), agent_at(1, 10.0, 10.0), agent_at(2, 10.0, 10.0)];
        agents[0].infect();
        agents[0].connections = vec![2];
        agents[2].connections = vec![0];

        for _ in 0..10 {
            run_day(&cfg, &mut agents, &mut rng);
        }

        assert_eq!(agents[1].status(), Status::Susceptible);
        assert_eq!(agents[2].status(), Status::Infected);
    }

    #[test]
    fn contact_distance_rule_respects_the_radius() {
        let cfg = Config {
            infection_rate: 100.0,
            ..test_config(Algorithm::Standard)
        };
        let mut rng = ChaCha12Rng::seed_from_u64(9);

        // One neighbor inside the contact radius, one outside.
        let mut agents = vec![agent_at(0, 0.0, 0.0), agent_at(1, 1.0, 0.0), agent_at(2, 6.0, 0.0)];
        agents[0].infect();

        run_day(&cfg, &mut agents, &mut rng);

        // At distance 1 the chance is 100 * (10/2)^2, far above 1.
        assert_eq!(agents[1].status(), Status::Infected);
        assert_eq!(agents[2].status(), Status::Susceptible);
    }

    #[test]
    fn blanket_vaccination_grants_durable_immunity_the_same_day() {
        let cfg = Config {
            vaccination_rate: 100.0,
            vaccination_effectiveness: 1.0,
            ..test_config(Algorithm::Standard)
        };
        let mut rng = ChaCha12Rng::seed_from_u64(13);

        let mut agents: Vec<Agent> = (0..10).map(|id| agent_at(id, 50.0, 50.0)).collect();
        run_day(&cfg, &mut agents, &mut rng);

        for agent in &agents {
            assert_eq!(agent.status(), Status::Recovered);
            assert_eq!(agent.immune_days(), VACCINE_IMMUNITY_DAYS);
        }
    }

    #[test]
    fn immunity_wanes_to_susceptible_when_the_countdown_ends() {
        let cfg = Config {
            infection_rate: 0.0,
            ..test_config(Algorithm::Standard)
        };
        let mut rng = ChaCha12Rng::seed_from_u64(17);

        let mut agents = vec![agent_at(0, 50.0, 50.0)];
        agents[0].status = Status::Recovered;
        agents[0].immune_days = 3;

        for expected in [2, 1] {
            run_day(&cfg, &mut agents, &mut rng);
            assert_eq!(agents[0].status(), Status::Recovered);
            assert_eq!(agents[0].immune_days(), expected);
        }

        run_day(&cfg, &mut agents, &mut rng);
        assert_eq!(agents[0].status(), Status::Susceptible);
    }

    #[test]
    fn seir_exposure_stays_on_susceptible_status_until_incubation() {
        let cfg = Config {
            infection_rate: 0.0,
            ..test_config(Algorithm::Seir)
        };
        let mut rng = ChaCha12Rng::seed_from_u64(21);

        let mut agents = vec![agent_at(0, 50.0, 50.0), agent_at(1, 50.0, 50.0)];
        agents[0].exposed = true;

        let mut incubated = false;
        for _ in 0..200 {
            run_day(&cfg, &mut agents, &mut rng);
            if agents[0].status() == Status::Infected {
                incubated = true;
                assert!(!agents[0].exposed());
                break;
            }
            assert_eq!(agents[0].status(), Status::Susceptible);
            assert!(agents[0].exposed());
        }

        assert!(incubated);
        // With a zero infection rate nobody else is ever drawn in.
        assert_eq!(agents[1].status(), Status::Susceptible);
        assert!(!agents[1].exposed());
    }
}
