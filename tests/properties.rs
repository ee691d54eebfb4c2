//! Invariants checked over seeded random play.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use water_sort::pour::{legal_pours, StandardRules};
use water_sort::{
    FluidContainer, FluidPacket, GameSession, Level, PourError, Selection, can_pour,
    generate_level, pour,
};

fn assert_capacity(level: &Level) {
    for container in level.containers() {
        assert!(container.get_filled_amount() <= container.get_capacity());
        assert_eq!(container.get_capacity(), level.capacity());
    }
}

fn random_level(rng: &mut StdRng) -> Level {
    let num_colors = rng.random_range(1..=6);
    let capacity = rng.random_range(1..=5);
    generate_level(num_colors, capacity, rng).unwrap()
}

#[test]
fn random_play_keeps_capacity_and_conserves_units() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let mut session = GameSession::new(random_level(&mut rng));
        let total = session.level().total_units();
        for _ in 0..200 {
            let n = session.level().len();
            if rng.random_bool(0.15) {
                let _ = session.undo();
            } else {
                session.select_container(rng.random_range(0..n)).unwrap();
            }
            assert_capacity(session.level());
            assert_eq!(session.level().total_units(), total);
        }
    }
}

#[test]
fn illegal_pours_never_change_anything() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..100 {
        let level = random_level(&mut rng);
        let before = level.clone();
        for from in 0..level.len() {
            for to in 0..level.len() {
                if let Err(PourError::Illegal(_)) = pour(&level, from, to) {
                    assert_eq!(can_pour(&level, from, to), Ok(false));
                }
                assert_eq!(level, before);
            }
        }
    }
}

#[test]
fn pours_move_min_of_run_and_room() {
    let mut rng = StdRng::seed_from_u64(23);
    let mut checked = 0;
    for _ in 0..100 {
        let mut session = GameSession::new(random_level(&mut rng));
        for _ in 0..30 {
            if session.is_victory() {
                break;
            }
            let moves = legal_pours(&StandardRules, session.level());
            let Some(&(from, to)) = moves.get(rng.random_range(0..moves.len().max(1))) else {
                break;
            };
            let level = session.level().clone();
            let run = level.containers()[from].get_top_fluid_depth();
            let room = level.containers()[to].get_empty_space();

            let outcome = pour(&level, from, to).unwrap();
            assert_eq!(outcome.mv.units(), run.min(room));
            assert_eq!(
                outcome.level.containers()[from].get_filled_amount(),
                level.containers()[from].get_filled_amount() - run.min(room)
            );
            checked += 1;

            session.select_container(from).unwrap();
            session.select_container(to).unwrap();
            assert_eq!(session.level(), &outcome.level);
        }
    }
    assert!(checked > 100);
}

#[test]
fn undo_right_after_a_pour_is_an_exact_inverse() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..100 {
        let mut session = GameSession::new(random_level(&mut rng));
        for _ in 0..20 {
            let moves = legal_pours(&StandardRules, session.level());
            if moves.is_empty() || session.is_victory() {
                break;
            }
            let (from, to) = moves[rng.random_range(0..moves.len())];
            let before = session.level().clone();
            let count = session.move_count();

            session.select_container(from).unwrap();
            let poured = session.select_container(to).unwrap();
            assert!(matches!(poured, Selection::Poured { .. }));

            let mv = session.undo().unwrap();
            assert_eq!((mv.from(), mv.to()), (from, to));
            assert_eq!(session.level(), &before);
            assert_eq!(session.move_count(), count);

            session.redo().unwrap();
        }
    }
}

#[test]
fn victory_matches_its_definition() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut wins = 0;
    for _ in 0..2000 {
        let capacity = rng.random_range(1..=4);
        let containers: Vec<FluidContainer> = (0..rng.random_range(1..=4))
            .map(|_| {
                let len = rng.random_range(0..=capacity);
                let packets = (0..len)
                    .map(|_| FluidPacket::new(rng.random_range(0..2)))
                    .collect();
                FluidContainer::with_packets(capacity, packets).unwrap()
            })
            .collect();
        let expected = containers.iter().all(|c| {
            let packets = c.get_packets();
            packets.is_empty()
                || (packets.len() == capacity && packets.iter().all(|p| *p == packets[0]))
        });
        let level = Level::new(containers).unwrap();
        assert_eq!(level.is_victory(), expected, "{level}");
        if expected {
            wins += 1;
        }
    }
    assert!(wins > 0);
}
